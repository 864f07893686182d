use goban_core::{ImageView, IntersectionState, StoneDetection};
use goban_lattice::{Frame, LatticeFitter};
use goban_stones::{PixelClassifier, StoneDetector, StoneStats};
use log::{debug, info, warn};

use super::{BoardDetectError, BoardDetectionResult, BoardDetectorParams};
use crate::assemble::BoardAssembler;
use crate::classify::{IntersectionClassifier, StoneIndex};
use crate::support::{choose_by_support, Placement};

/// Stone-first go board detector.
#[derive(Clone, Debug)]
pub struct BoardDetector {
    params: BoardDetectorParams,
    stones: StoneDetector,
    fitter: LatticeFitter,
    classifier: IntersectionClassifier,
    assembler: BoardAssembler,
}

impl Default for BoardDetector {
    fn default() -> Self {
        Self::new(BoardDetectorParams::default())
    }
}

impl BoardDetector {
    pub fn new(params: BoardDetectorParams) -> Self {
        let stones = StoneDetector::new(params.stone_params());
        let fitter = LatticeFitter::new(params.lattice.clone());
        let classifier = IntersectionClassifier::new(
            params.intersections.clone(),
            PixelClassifier::new(params.pixel),
        );
        let assembler = BoardAssembler::new(params.assembler_params());
        Self {
            params,
            stones,
            fitter,
            classifier,
            assembler,
        }
    }

    /// Detector parameters.
    #[inline]
    pub fn params(&self) -> &BoardDetectorParams {
        &self.params
    }

    /// Recognize the board in a decoded photograph.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip(self, image), fields(width = image.width, height = image.height))
    )]
    pub fn detect(&self, image: &ImageView<'_>) -> Result<BoardDetectionResult, BoardDetectError> {
        let out = self.stones.detect(image);
        self.run(image, out.stones, out.stats)
    }

    /// Recognize the board using externally supplied stone detections.
    ///
    /// Pixel classification and blob extraction are skipped; the image is
    /// still read for placement and intersection classification. Detections
    /// below `filter.min_confidence` are dropped, as the stone filter would.
    pub fn detect_with_stones(
        &self,
        image: &ImageView<'_>,
        stones: &[StoneDetection],
    ) -> Result<BoardDetectionResult, BoardDetectError> {
        let min_confidence = self.params.filter.min_confidence;
        let kept: Vec<StoneDetection> = stones
            .iter()
            .filter(|s| s.confidence >= min_confidence)
            .copied()
            .collect();
        if kept.len() < stones.len() {
            debug!(
                "{} of {} supplied detections below confidence {:.2}",
                stones.len() - kept.len(),
                stones.len(),
                min_confidence
            );
        }
        let stats = StoneStats {
            blobs: stones.len(),
            rejected: stones.len() - kept.len(),
            ..StoneStats::default()
        };
        self.run(image, kept, stats)
    }

    /// Wrap an interleaved RGB8 buffer and detect.
    pub fn detect_rgb8(
        &self,
        width: usize,
        height: usize,
        data: &[u8],
    ) -> Result<BoardDetectionResult, BoardDetectError> {
        let view = ImageView::rgb(width, height, data)?;
        self.detect(&view)
    }

    fn run(
        &self,
        image: &ImageView<'_>,
        stones: Vec<StoneDetection>,
        stone_stats: StoneStats,
    ) -> Result<BoardDetectionResult, BoardDetectError> {
        let required = self.params.min_stones.max(1);
        if stones.len() < required {
            warn!("{} stones detected, {} required", stones.len(), required);
            return Err(BoardDetectError::NoStonesDetected {
                found: stones.len(),
                required,
            });
        }

        let fit = self
            .fitter
            .fit(&stones, Some(Frame::image(image.width, image.height)))?;

        let index = StoneIndex::new(&stones);
        let match_radius = self.params.lattice.match_radius_rel * fit.seed_spacing;
        let (chosen, placement) = choose_by_support(
            &self.classifier,
            image,
            &index,
            &stones,
            &fit.tied,
            match_radius,
        )
        .unwrap_or_else(|| {
            let model = *fit.model();
            (
                0,
                Placement {
                    model,
                    shift: (0, 0),
                    supported: 0,
                    support: 0.0,
                },
            )
        });
        if placement.support < self.params.min_board_support {
            warn!(
                "{} lattice has stone or line support at {:.2} of its intersections, {:.2} required",
                placement.model.board_size,
                placement.support,
                self.params.min_board_support
            );
            return Err(BoardDetectError::NoAcceptableBoardSize {
                residuals: fit.residuals(),
            });
        }
        let residual = fit.tied.get(chosen).map_or(f32::INFINITY, |c| c.residual);

        let readings = self.classifier.classify(image, &placement.model, &index);
        let board = self.assembler.assemble(&placement.model, &readings, residual);

        let result = BoardDetectionResult {
            board,
            stones,
            stone_stats,
            fit,
            placement,
            readings,
        };
        info!(
            "board: {} ({} black, {} white), support {:.2}, {} ambiguous, {} low confidence, confidence {:.3}",
            result.board.board_size,
            result.board.count(IntersectionState::Black),
            result.board.count(IntersectionState::White),
            result.placement.support,
            result.ambiguous_count(),
            result.low_confidence_count(),
            result.board.confidence
        );
        Ok(result)
    }
}
