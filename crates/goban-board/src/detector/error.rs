use goban_core::ImageError;
use goban_lattice::{LatticeFitError, SizeResidual};

/// Errors returned by the board detector.
///
/// Ambiguous intersections are not errors; they are flagged on the
/// returned board.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoardDetectError {
    #[error("no stones detected (found {found}, required {required})")]
    NoStonesDetected { found: usize, required: usize },
    #[error("lattice fit did not converge for any board size (best residual {best_residual:.3})")]
    FitDidNotConverge { best_residual: f32 },
    #[error("no board found ({})", format_residuals(.residuals))]
    NoAcceptableBoardSize { residuals: Vec<SizeResidual> },
    #[error(transparent)]
    Image(#[from] ImageError),
}

fn format_residuals(residuals: &[SizeResidual]) -> String {
    residuals
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<LatticeFitError> for BoardDetectError {
    fn from(err: LatticeFitError) -> Self {
        match err {
            LatticeFitError::NotEnoughDetections { found, required } => {
                BoardDetectError::NoStonesDetected { found, required }
            }
            LatticeFitError::FitDidNotConverge { best_residual } => {
                BoardDetectError::FitDidNotConverge { best_residual }
            }
            LatticeFitError::NoAcceptableBoardSize { residuals } => {
                BoardDetectError::NoAcceptableBoardSize { residuals }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goban_core::BoardSize;

    #[test]
    fn fit_errors_map_onto_the_taxonomy() {
        let err: BoardDetectError = LatticeFitError::NotEnoughDetections {
            found: 0,
            required: 1,
        }
        .into();
        assert_eq!(
            err,
            BoardDetectError::NoStonesDetected {
                found: 0,
                required: 1
            }
        );

        let residuals = vec![SizeResidual {
            board_size: BoardSize::Nine,
            residual: 0.31,
            inlier_fraction: 0.5,
            converged: true,
        }];
        let err: BoardDetectError = LatticeFitError::NoAcceptableBoardSize {
            residuals: residuals.clone(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "no board found (9x9: residual 0.310, inliers 50%)"
        );
        assert_eq!(err, BoardDetectError::NoAcceptableBoardSize { residuals });
    }
}
