use goban_lattice::LatticeFitParams;
use goban_stones::{BlobParams, PixelClassifierParams, StoneDetectorParams, StoneFilterParams};
use serde::{Deserialize, Serialize};

use crate::assemble::AssemblerParams;
use crate::classify::IntersectionParams;

/// Configuration for the board detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardDetectorParams {
    /// Gray-level thresholds shared by stone detection and patch reading.
    pub pixel: PixelClassifierParams,
    pub blobs: BlobParams,
    pub filter: StoneFilterParams,
    pub lattice: LatticeFitParams,
    pub intersections: IntersectionParams,
    /// Fewer stone detections than this stop the run.
    pub min_stones: usize,
    /// Cells below this confidence are reported Empty and flagged.
    pub confidence_floor: f32,
    /// The placed board must show a stone or a line crossing at this share
    /// of its intersections, or no board is reported.
    pub min_board_support: f32,
}

impl Default for BoardDetectorParams {
    fn default() -> Self {
        Self {
            pixel: PixelClassifierParams::default(),
            blobs: BlobParams::default(),
            filter: StoneFilterParams::default(),
            lattice: LatticeFitParams::default(),
            intersections: IntersectionParams::default(),
            min_stones: 1,
            confidence_floor: 0.5,
            min_board_support: 0.5,
        }
    }
}

impl BoardDetectorParams {
    pub fn stone_params(&self) -> StoneDetectorParams {
        StoneDetectorParams {
            pixel: self.pixel,
            blobs: self.blobs.clone(),
            filter: self.filter.clone(),
        }
    }

    pub fn assembler_params(&self) -> AssemblerParams {
        AssemblerParams {
            confidence_floor: self.confidence_floor,
            max_residual_rel: self.lattice.max_residual_rel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goban_core::BoardSize;

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "pixel": { "black_threshold": 60 },
            "lattice": { "board_sizes": [19], "max_iterations": 200 },
            "confidence_floor": 0.6
        }"#;
        let params: BoardDetectorParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.pixel.black_threshold, 60);
        assert_eq!(params.pixel.white_threshold, 170);
        assert_eq!(params.lattice.board_sizes, vec![BoardSize::Nineteen]);
        assert_eq!(params.lattice.max_iterations, 200);
        assert_eq!(params.lattice.scale_epsilon, 0.01);
        assert_eq!(params.intersections, IntersectionParams::default());
        assert_eq!(params.min_stones, 1);
        assert_eq!(params.min_board_support, 0.5);
        assert_eq!(params.assembler_params().confidence_floor, 0.6);
        assert_eq!(params.stone_params().pixel.black_threshold, 60);
    }
}
