//! Board placement from image evidence.
//!
//! Stones constrain the lattice only where they are. Which whole-node
//! translation of the finite board is right, and which of several equally
//! good board sizes, is decided here by counting intersections that
//! actually show a stone or a line crossing.

use goban_core::{GridCoords, ImageView, LatticeModel, StoneDetection};
use goban_lattice::{allowed_shifts, Frame, LatticeCandidate, Objective};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::classify::{IntersectionClassifier, StoneIndex};

/// Support must beat the current choice by more than this to replace it.
const SUPPORT_MARGIN: f32 = 0.02;

/// A board placed on the lattice.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub model: LatticeModel,
    /// Row and column shift applied to the fitted model.
    pub shift: (i32, i32),
    /// Intersections showing a stone or a line crossing.
    pub supported: usize,
    /// `supported / n²`.
    pub support: f32,
}

/// Support bits for a rectangle of lattice nodes, labelled by the input model.
struct SupportGrid {
    row0: i32,
    col0: i32,
    cols: usize,
    bits: Vec<bool>,
}

impl SupportGrid {
    fn count(&self, row: i32, col: i32, lines: i32) -> usize {
        let mut n = 0;
        for r in row..row + lines {
            let base = (r - self.row0) as usize * self.cols;
            for c in col..col + lines {
                n += self.bits[base + (c - self.col0) as usize] as usize;
            }
        }
        n
    }
}

/// Pick the translation of `model` with the most supported intersections
/// among those keeping every matched detection on the board.
///
/// Ties keep the fitted placement, then prefer the lattice centre nearest
/// the image centre.
pub fn place_by_support(
    classifier: &IntersectionClassifier,
    image: &ImageView<'_>,
    index: &StoneIndex<'_>,
    stones: &[StoneDetection],
    model: &LatticeModel,
    match_radius: f32,
) -> Placement {
    let m = model.board_size.max_index();
    let lines = m + 1;
    let (rows, cols) = Objective::new(stones, match_radius)
        .assign(model)
        .and_then(|a| allowed_shifts(model.board_size, &a))
        .unwrap_or((0..=0, 0..=0));

    let (row0, col0) = (*rows.start(), *cols.start());
    let height = (rows.end() - row0 + lines) as usize;
    let width = (cols.end() - col0 + lines) as usize;
    let threshold = classifier.params().line_support_fraction;
    let mut bits = Vec::with_capacity(width * height);
    for r in 0..height as i32 {
        for c in 0..width as i32 {
            let coords = GridCoords::new(row0 + r, col0 + c);
            let reading = classifier.read(image, model, coords, index);
            bits.push(reading.supports_board(threshold));
        }
    }
    let grid = SupportGrid {
        row0,
        col0,
        cols: width,
        bits,
    };

    let target = Frame::image(image.width, image.height).center();
    let mut best: Option<(Placement, bool, f32)> = None;
    for d_row in rows {
        for d_col in cols.clone() {
            let candidate = model.shifted(d_row, d_col);
            let supported = grid.count(d_row, d_col, lines);
            let fitted = d_row == 0 && d_col == 0;
            let dist = (candidate.center() - target).norm_squared();
            let better = match &best {
                None => true,
                Some((b, b_fitted, b_dist)) => {
                    supported > b.supported
                        || (supported == b.supported && fitted && !b_fitted)
                        || (supported == b.supported && fitted == *b_fitted && dist < *b_dist)
                }
            };
            if better {
                let placement = Placement {
                    model: candidate,
                    shift: (d_row, d_col),
                    supported,
                    support: supported as f32 / model.board_size.intersections() as f32,
                };
                best = Some((placement, fitted, dist));
            }
        }
    }

    match best {
        Some((placement, _, _)) => placement,
        None => Placement {
            model: *model,
            shift: (0, 0),
            supported: 0,
            support: 0.0,
        },
    }
}

/// Place every tied candidate by support and pick one.
///
/// Candidates arrive in fitter order; a later one wins only with clearly
/// higher support. Returns the index into `tied` and its placement.
pub fn choose_by_support(
    classifier: &IntersectionClassifier,
    image: &ImageView<'_>,
    index: &StoneIndex<'_>,
    stones: &[StoneDetection],
    tied: &[LatticeCandidate],
    match_radius: f32,
) -> Option<(usize, Placement)> {
    let mut chosen: Option<(usize, Placement)> = None;
    for (i, candidate) in tied.iter().enumerate() {
        let placement = place_by_support(
            classifier,
            image,
            index,
            stones,
            &candidate.model,
            match_radius,
        );
        debug!(
            "{}: support {:.3} ({} nodes), shift ({}, {})",
            candidate.board_size(),
            placement.support,
            placement.supported,
            placement.shift.0,
            placement.shift.1
        );
        let replace = match &chosen {
            None => true,
            Some((_, best)) => placement.support > best.support + SUPPORT_MARGIN,
        };
        if replace {
            chosen = Some((i, placement));
        }
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use goban_core::{BoardSize, PixelBuffer, Point2};
    use goban_stones::{PixelClassifier, PixelClassifierParams};

    use crate::classify::IntersectionParams;

    fn classifier() -> IntersectionClassifier {
        IntersectionClassifier::new(
            IntersectionParams::default(),
            PixelClassifier::new(PixelClassifierParams::default()),
        )
    }

    /// 9×9 board, spacing 30, top-left intersection at (60, 60), in a
    /// 420×420 image, with one black stone at (0, 0).
    fn scene() -> (PixelBuffer, LatticeModel, Vec<StoneDetection>) {
        let truth = LatticeModel::new(BoardSize::Nine, 30.0, 0.0, Point2::new(60.0, 60.0));
        let mut buf = PixelBuffer::filled_rgb(420, 420, [205, 165, 95]);
        for k in 0..9 {
            let c = 60 + 30 * k;
            for t in 59..=301 {
                for w in -1..=1 {
                    buf.put_rgb(c + w, t, [70, 50, 30]);
                    buf.put_rgb(t, c + w, [70, 50, 30]);
                }
            }
        }
        for y in 46..=74 {
            for x in 46..=74 {
                let (dx, dy) = (x as f32 - 60.0, y as f32 - 60.0);
                if dx * dx + dy * dy <= 13.8 * 13.8 {
                    buf.put_rgb(x, y, [20, 20, 20]);
                }
            }
        }
        let stones = vec![StoneDetection {
            center: Point2::new(60.0, 60.0),
            radius: 13.8,
            confidence: 1.0,
        }];
        (buf, truth, stones)
    }

    #[test]
    fn shift_lands_on_the_drawn_board() {
        let (buf, truth, stones) = scene();
        let view = buf.view();
        let index = StoneIndex::new(&stones);
        // The lone stone labelled as the board centre.
        let start = truth.shifted(-4, -4);
        let placed = place_by_support(&classifier(), &view, &index, &stones, &start, 12.0);
        assert_eq!(placed.shift, (4, 4));
        assert_eq!(placed.supported, 81);
        assert!((placed.model.origin - truth.origin).norm() < 1e-3);
    }

    #[test]
    fn smaller_board_with_full_support_wins() {
        let (buf, truth, stones) = scene();
        let view = buf.view();
        let index = StoneIndex::new(&stones);
        let candidate = |size: BoardSize| LatticeCandidate {
            model: LatticeModel { board_size: size, ..truth },
            objective: 0.0,
            rms: 0.0,
            residual: 0.0,
            inliers: 1,
            detections: 1,
            coverage: 1.0,
            iterations: 10,
            converged: true,
            accepted: true,
        };
        let tied = [candidate(BoardSize::Thirteen), candidate(BoardSize::Nine)];
        let (i, placement) =
            choose_by_support(&classifier(), &view, &index, &stones, &tied, 12.0).unwrap();
        assert_eq!(i, 1);
        assert_eq!(placement.model.board_size, BoardSize::Nine);
        assert_eq!(placement.support, 1.0);
    }

    #[test]
    fn drawn_lines_beat_a_turned_lattice() {
        let (buf, truth, stones) = scene();
        let view = buf.view();
        let index = StoneIndex::new(&stones);
        let turned = LatticeModel::from_spacing_angle(
            BoardSize::Nine,
            30.0,
            -(3.0f32 / 4.0).atan(),
            truth.origin,
        );
        let candidate = |model: LatticeModel| LatticeCandidate {
            model,
            objective: 0.0,
            rms: 0.0,
            residual: 0.0,
            inliers: 1,
            detections: 1,
            coverage: 1.0,
            iterations: 10,
            converged: true,
            accepted: true,
        };
        let tied = [candidate(turned), candidate(truth)];
        let (i, placement) =
            choose_by_support(&classifier(), &view, &index, &stones, &tied, 12.0).unwrap();
        assert_eq!(i, 1);
        assert_eq!(placement.support, 1.0);
        assert!((placement.model.origin - truth.origin).norm() < 1e-3);
    }
}
