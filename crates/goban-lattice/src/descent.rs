//! Cyclic coordinate descent over `(a, b, x0, y0)` and the least-squares
//! polish that follows it.

use goban_core::{LatticeModel, Point2};
use nalgebra::{Matrix4, Vector4};

use crate::objective::Objective;

/// Outcome of one descent run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DescentOutcome {
    pub model: LatticeModel,
    pub objective: f32,
    /// Full cycles performed.
    pub iterations: usize,
    /// Every step fell below its epsilon before the iteration cap.
    pub converged: bool,
}

/// Initial steps and stopping thresholds, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DescentSteps {
    pub scale_step: f32,
    pub origin_step: f32,
    pub scale_epsilon: f32,
    pub origin_epsilon: f32,
    pub max_iterations: usize,
}

fn params_of(m: &LatticeModel) -> [f32; 4] {
    [m.a, m.b, m.origin.x, m.origin.y]
}

fn with_params(m: &LatticeModel, p: [f32; 4]) -> LatticeModel {
    LatticeModel::new(m.board_size, p[0], p[1], Point2::new(p[2], p[3]))
}

/// For each parameter in turn, try `value ± step` and move to the lowest
/// objective; halve the step when staying put is best. Nearest-node
/// assignments are recomputed on every evaluation.
pub fn coordinate_descent(
    objective: &Objective<'_>,
    start: LatticeModel,
    steps: &DescentSteps,
) -> DescentOutcome {
    let mut p = params_of(&start);
    let mut step = [
        steps.scale_step,
        steps.scale_step,
        steps.origin_step,
        steps.origin_step,
    ];
    let eps = [
        steps.scale_epsilon,
        steps.scale_epsilon,
        steps.origin_epsilon,
        steps.origin_epsilon,
    ];
    let mut best = objective.evaluate(&start);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < steps.max_iterations {
        if step.iter().zip(&eps).all(|(s, e)| s < e) {
            converged = true;
            break;
        }
        iterations += 1;
        for k in 0..4 {
            if step[k] < eps[k] {
                continue;
            }
            let base = p[k];
            let mut moved = false;
            for candidate in [base - step[k], base + step[k]] {
                let mut trial = p;
                trial[k] = candidate;
                let value = objective.evaluate(&with_params(&start, trial));
                if value < best {
                    best = value;
                    p = trial;
                    moved = true;
                }
            }
            if !moved {
                step[k] *= 0.5;
            }
        }
    }
    if !converged && step.iter().zip(&eps).all(|(s, e)| s < e) {
        converged = true;
    }

    DescentOutcome {
        model: with_params(&start, p),
        objective: best,
        iterations,
        converged,
    }
}

/// Closed-form weighted similarity fit to the inlier assignments of `model`.
///
/// Each inlier contributes the rows `[c, -r, 1, 0]` and `[r, c, 0, 1]` of
/// the linear system in `(a, b, x0, y0)`. `None` with fewer than
/// `min_inliers` or a singular system (all inliers on one node).
pub fn least_squares_step(
    objective: &Objective<'_>,
    model: &LatticeModel,
    min_inliers: usize,
) -> Option<LatticeModel> {
    let assignments = objective.assign(model)?;
    let mut ata = Matrix4::<f64>::zeros();
    let mut atb = Vector4::<f64>::zeros();
    let mut count = 0usize;
    let mut first_node = None;
    let mut distinct = false;

    for (d, a) in objective.detections().iter().zip(&assignments) {
        if !a.inlier {
            continue;
        }
        let w = d.confidence.max(0.0) as f64;
        if w <= 0.0 {
            continue;
        }
        count += 1;
        match first_node {
            None => first_node = Some(a.coords),
            Some(node) => distinct |= node != a.coords,
        }
        let r = a.coords.row as f64;
        let c = a.coords.col as f64;
        let rows = [
            (Vector4::new(c, -r, 1.0, 0.0), d.center.x as f64),
            (Vector4::new(r, c, 0.0, 1.0), d.center.y as f64),
        ];
        for (row, rhs) in rows {
            ata += w * row * row.transpose();
            atb += w * rhs * row;
        }
    }
    if count < min_inliers || !distinct {
        return None;
    }

    let x = ata.cholesky()?.solve(&atb);
    let model = LatticeModel::new(
        model.board_size,
        x[0] as f32,
        x[1] as f32,
        Point2::new(x[2] as f32, x[3] as f32),
    );
    model.a.is_finite().then_some(model)
}

/// Alternate assignment and closed-form solve until the inlier set stops
/// changing. Returns the polished model only if it does not raise the
/// objective.
pub fn polish(
    objective: &Objective<'_>,
    model: LatticeModel,
    min_inliers: usize,
    max_rounds: usize,
) -> Option<(LatticeModel, f32)> {
    let start_value = objective.evaluate(&model);
    let mut current = model;
    let mut assignment = objective.assign(&current)?;

    for _ in 0..max_rounds {
        let next = least_squares_step(objective, &current, min_inliers)?;
        let next_assignment = objective.assign(&next)?;
        let stable = next_assignment
            .iter()
            .zip(&assignment)
            .all(|(x, y)| x.coords == y.coords && x.inlier == y.inlier);
        current = next;
        assignment = next_assignment;
        if stable {
            break;
        }
    }

    let value = objective.evaluate(&current);
    (value <= start_value).then_some((current, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use goban_core::{BoardSize, GridCoords, StoneDetection};

    fn steps(spacing: f32) -> DescentSteps {
        DescentSteps {
            scale_step: 0.1 * spacing,
            origin_step: 0.25 * spacing,
            scale_epsilon: 0.01,
            origin_epsilon: 0.1,
            max_iterations: 1000,
        }
    }

    fn detections(model: &LatticeModel, nodes: &[(i32, i32)]) -> Vec<StoneDetection> {
        nodes
            .iter()
            .map(|&(r, c)| StoneDetection {
                center: model.position(GridCoords::new(r, c)),
                radius: 15.0,
                confidence: 1.0,
            })
            .collect()
    }

    const NODES: [(i32, i32); 7] = [(0, 0), (0, 8), (8, 0), (8, 8), (4, 4), (2, 6), (6, 3)];

    #[test]
    fn descent_walks_to_a_perturbed_model() {
        let truth = LatticeModel::from_spacing_angle(
            BoardSize::Nine,
            32.0,
            6f32.to_radians(),
            Point2::new(80.0, 50.0),
        );
        let dets = detections(&truth, &NODES);
        let objective = Objective::new(&dets, 0.4 * 32.0);
        let start = LatticeModel::new(BoardSize::Nine, 31.5, 3.0, Point2::new(82.0, 48.0));

        let out = coordinate_descent(&objective, start, &steps(32.0));
        assert!(out.converged);
        assert!(out.objective < objective.evaluate(&start));
        assert_abs_diff_eq!(out.model.spacing(), truth.spacing(), epsilon = 0.3);
    }

    #[test]
    fn polish_recovers_exact_parameters() {
        let truth = LatticeModel::from_spacing_angle(
            BoardSize::Nine,
            32.0,
            -12f32.to_radians(),
            Point2::new(60.0, 120.0),
        );
        let dets = detections(&truth, &NODES);
        let objective = Objective::new(&dets, 0.4 * 32.0);
        // Inside the capture radius of every node.
        let rough = LatticeModel::new(
            BoardSize::Nine,
            truth.a + 0.2,
            truth.b - 0.2,
            truth.origin + nalgebra::Vector2::new(1.5, -1.0),
        );

        let (model, value) = polish(&objective, rough, 3, 10).unwrap();
        assert_abs_diff_eq!(model.a, truth.a, epsilon = 1e-3);
        assert_abs_diff_eq!(model.b, truth.b, epsilon = 1e-3);
        assert_abs_diff_eq!(model.origin.x, truth.origin.x, epsilon = 1e-2);
        assert_abs_diff_eq!(model.origin.y, truth.origin.y, epsilon = 1e-2);
        assert!(value < 1e-3);
    }

    #[test]
    fn polish_needs_distinct_nodes() {
        let model = LatticeModel::new(BoardSize::Nine, 30.0, 0.0, Point2::new(0.0, 0.0));
        let dets = detections(&model, &[(3, 3)]);
        let objective = Objective::new(&dets, 12.0);
        assert!(polish(&objective, model, 3, 10).is_none());
        assert!(least_squares_step(&objective, &model, 1).is_none());
    }
}
