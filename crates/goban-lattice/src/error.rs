use std::fmt;

use goban_core::BoardSize;
use serde::{Deserialize, Serialize};

/// Final residual of one board-size candidate, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeResidual {
    pub board_size: BoardSize,
    /// Confidence-weighted RMS pixel distance of the inlier detections,
    /// divided by the fitted spacing. Unitless.
    pub residual: f32,
    pub inlier_fraction: f32,
    pub converged: bool,
}

impl fmt::Display for SizeResidual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: residual {:.3}, inliers {:.0}%{}",
            self.board_size,
            self.residual,
            self.inlier_fraction * 100.0,
            if self.converged { "" } else { " (not converged)" }
        )
    }
}

/// Errors returned by [`crate::LatticeFitter`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LatticeFitError {
    #[error("not enough detections to fit a lattice (found {found}, required {required})")]
    NotEnoughDetections { found: usize, required: usize },
    #[error("lattice search did not converge for any board size (best residual {best_residual:.3})")]
    FitDidNotConverge { best_residual: f32 },
    #[error("no board size fits the detections ({})", format_residuals(.residuals))]
    NoAcceptableBoardSize { residuals: Vec<SizeResidual> },
}

fn format_residuals(residuals: &[SizeResidual]) -> String {
    residuals
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
