use goban_core::{BoardState, Intersection, IntersectionState, LatticeModel};
use serde::{Deserialize, Serialize};

use crate::classify::PatchReading;

/// Assembly settings.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AssemblerParams {
    /// Cells below this confidence are reported Empty and flagged.
    pub confidence_floor: f32,
    /// Normalized fit residual at which the fit quality reaches zero.
    pub max_residual_rel: f32,
}

impl Default for AssemblerParams {
    fn default() -> Self {
        Self {
            confidence_floor: 0.5,
            max_residual_rel: 0.15,
        }
    }
}

/// Turns per-node readings into the final [`BoardState`].
#[derive(Clone, Debug, Default)]
pub struct BoardAssembler {
    params: AssemblerParams,
}

impl BoardAssembler {
    pub fn new(params: AssemblerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &AssemblerParams {
        &self.params
    }

    /// `1` for an exact fit, falling linearly to `0` at the residual limit.
    pub fn fit_quality(&self, residual: f32) -> f32 {
        if self.params.max_residual_rel <= 0.0 || !residual.is_finite() {
            return 0.0;
        }
        (1.0 - residual / self.params.max_residual_rel).clamp(0.0, 1.0)
    }

    /// Build the board from row-major readings of `model`'s intersections.
    ///
    /// Every intersection of the model yields exactly one cell; a missing
    /// reading becomes an ambiguous, zero-confidence Empty cell.
    pub fn assemble(
        &self,
        model: &LatticeModel,
        readings: &[PatchReading],
        residual: f32,
    ) -> BoardState {
        let intersections: Vec<Intersection> = model
            .intersections()
            .enumerate()
            .map(|(i, (coords, position))| {
                let (state, confidence, ambiguous) = match readings.get(i) {
                    Some(r) if r.coords == coords => (r.state, r.confidence, r.ambiguous),
                    _ => (IntersectionState::Empty, 0.0, true),
                };
                let low_confidence = confidence < self.params.confidence_floor;
                Intersection {
                    coords,
                    position,
                    state: if low_confidence {
                        IntersectionState::Empty
                    } else {
                        state
                    },
                    confidence,
                    ambiguous,
                    low_confidence,
                }
            })
            .collect();

        let mean = if intersections.is_empty() {
            0.0
        } else {
            intersections.iter().map(|c| c.confidence).sum::<f32>() / intersections.len() as f32
        };
        let (top_left, bottom_right) = model.corners();

        BoardState {
            board_size: model.board_size,
            top_left,
            bottom_right,
            lattice: *model,
            intersections,
            confidence: self.fit_quality(residual) * mean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use goban_core::{BoardSize, GridCoords, Point2};

    fn reading(model: &LatticeModel, row: i32, col: i32, state: IntersectionState, confidence: f32) -> PatchReading {
        let coords = GridCoords::new(row, col);
        PatchReading {
            coords,
            position: model.position(coords),
            state,
            confidence,
            ambiguous: false,
            detected: false,
            light: 0.0,
            dark: 0.0,
            line: 1.0,
            in_frame: true,
        }
    }

    #[test]
    fn floor_keeps_cardinality_and_flags_cells() {
        let model = LatticeModel::new(BoardSize::Nine, 20.0, 0.0, Point2::new(10.0, 10.0));
        let mut readings: Vec<_> = model
            .intersections()
            .map(|(c, _)| reading(&model, c.row, c.col, IntersectionState::Empty, 1.0))
            .collect();
        readings[0] = reading(&model, 0, 0, IntersectionState::Black, 0.9);
        readings[1] = reading(&model, 0, 1, IntersectionState::White, 0.4);
        // Drop the last reading entirely.
        readings.pop();

        let board = BoardAssembler::default().assemble(&model, &readings, 0.0);
        assert_eq!(board.intersections.len(), 81);
        assert_eq!(board.state(0, 0), Some(IntersectionState::Black));
        let weak = board.get(0, 1).unwrap();
        assert_eq!(weak.state, IntersectionState::Empty);
        assert!(weak.low_confidence);
        assert_abs_diff_eq!(weak.confidence, 0.4);
        let missing = board.get(8, 8).unwrap();
        assert!(missing.ambiguous && missing.low_confidence);

        assert_eq!(board.top_left, Point2::new(10.0, 10.0));
        assert_eq!(board.bottom_right, Point2::new(170.0, 170.0));
        let expected = (0.9 + 0.4 + 78.0) / 81.0;
        assert_abs_diff_eq!(board.confidence, expected, epsilon = 1e-5);
    }

    #[test]
    fn residual_scales_overall_confidence() {
        let a = BoardAssembler::default();
        assert_abs_diff_eq!(a.fit_quality(0.0), 1.0);
        assert_abs_diff_eq!(a.fit_quality(0.075), 0.5, epsilon = 1e-6);
        assert_eq!(a.fit_quality(0.3), 0.0);
        assert_eq!(a.fit_quality(f32::INFINITY), 0.0);
    }
}
