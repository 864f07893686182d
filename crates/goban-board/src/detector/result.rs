use goban_core::{BoardState, StoneDetection};
use goban_lattice::LatticeFit;
use goban_stones::StoneStats;
use serde::{Deserialize, Serialize};

use crate::classify::PatchReading;
use crate::score::{count_territory, score, Score, Territory};
use crate::support::Placement;

/// Output of a board detection run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardDetectionResult {
    pub board: BoardState,
    /// Stone detections the lattice was fitted to.
    pub stones: Vec<StoneDetection>,
    pub stone_stats: StoneStats,
    /// Every board-size candidate and the tied set the board was chosen from.
    pub fit: LatticeFit,
    /// Final placement of the chosen board on its lattice.
    pub placement: Placement,
    /// Raw per-intersection readings, row-major.
    pub readings: Vec<PatchReading>,
}

impl BoardDetectionResult {
    /// Intersections whose patch matched no signature.
    pub fn ambiguous_count(&self) -> usize {
        self.board
            .intersections
            .iter()
            .filter(|i| i.ambiguous)
            .count()
    }

    pub fn low_confidence_count(&self) -> usize {
        self.board
            .intersections
            .iter()
            .filter(|i| i.low_confidence)
            .count()
    }

    pub fn territory(&self) -> Territory {
        count_territory(&self.board)
    }

    pub fn score(&self) -> Score {
        score(&self.board)
    }
}
