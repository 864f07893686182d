//! Where the finite board sits on the infinite lattice.
//!
//! The descent only constrains the lattice up to a whole-node translation
//! and a quarter-turn relabelling; the helpers here fix both.

use std::f32::consts::FRAC_PI_2;
use std::ops::RangeInclusive;

use goban_core::{BoardSize, GridCoords, LatticeModel, Point2, StoneDetection};
use serde::{Deserialize, Serialize};

use crate::objective::{Assignment, Objective};

/// Axis-aligned image region, in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub min: Point2<f32>,
    pub max: Point2<f32>,
}

impl Frame {
    /// The full image of `width × height` pixels.
    pub fn image(width: usize, height: usize) -> Self {
        Self {
            min: Point2::new(0.0, 0.0),
            max: Point2::new(
                width.saturating_sub(1) as f32,
                height.saturating_sub(1) as f32,
            ),
        }
    }

    /// Bounding box of the detections grown by `pad` on every side.
    pub fn around(detections: &[StoneDetection], pad: f32) -> Option<Self> {
        let first = detections.first()?.center;
        let (mut min, mut max) = (first, first);
        for d in detections {
            min.x = min.x.min(d.center.x);
            min.y = min.y.min(d.center.y);
            max.x = max.x.max(d.center.x);
            max.y = max.y.max(d.center.y);
        }
        Some(Self {
            min: Point2::new(min.x - pad, min.y - pad),
            max: Point2::new(max.x + pad, max.y + pad),
        })
    }

    pub fn center(&self) -> Point2<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    #[inline]
    pub fn contains(&self, p: Point2<f32>, margin: f32) -> bool {
        p.x >= self.min.x + margin
            && p.y >= self.min.y + margin
            && p.x <= self.max.x - margin
            && p.y <= self.max.y - margin
    }

    /// Number of board intersections of `model` inside the frame.
    pub fn visible_nodes(&self, model: &LatticeModel, margin: f32) -> usize {
        model
            .intersections()
            .filter(|(_, p)| self.contains(*p, margin))
            .count()
    }
}

/// Seed lattice with the detections centred on the board.
///
/// The detection closest to the detections' centroid is put exactly on a
/// node, so the lattice phase matches the stones from the start.
pub fn centred_start(
    detections: &[StoneDetection],
    board_size: BoardSize,
    spacing: f32,
    rotation: f32,
) -> LatticeModel {
    let base = LatticeModel::from_spacing_angle(board_size, spacing, rotation, Point2::origin());
    let coords: Vec<(f32, f32)> = detections
        .iter()
        .filter_map(|d| base.to_lattice(d.center))
        .collect();
    if coords.is_empty() || coords.len() != detections.len() {
        return base;
    }

    let (mut r0, mut r1, mut c0, mut c1) = (f32::MAX, f32::MIN, f32::MAX, f32::MIN);
    for &(r, c) in &coords {
        r0 = r0.min(r);
        r1 = r1.max(r);
        c0 = c0.min(c);
        c1 = c1.max(c);
    }

    let n = detections.len() as f32;
    let centroid = detections
        .iter()
        .fold(Point2::<f32>::origin(), |acc, d| acc + d.center.coords / n);
    let anchor = detections
        .iter()
        .enumerate()
        .min_by(|(_, x), (_, y)| {
            let dx = (x.center - centroid).norm_squared();
            let dy = (y.center - centroid).norm_squared();
            dx.total_cmp(&dy)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let m = board_size.max_index();
    let first_row = ((m - (r1 - r0).round() as i32) / 2).max(0);
    let first_col = ((m - (c1 - c0).round() as i32) / 2).max(0);
    let (ar, ac) = coords[anchor];
    let row = first_row + (ar - r0).round() as i32;
    let col = first_col + (ac - c0).round() as i32;

    let offset = base.project(row as f32, col as f32);
    LatticeModel {
        origin: detections[anchor].center - offset.coords,
        ..base
    }
}

/// Relabel by quarter turns so that `a > 0` and `|b| <= a`.
pub fn canonical(model: &LatticeModel) -> LatticeModel {
    let quarter_turns = (model.rotation() / FRAC_PI_2).round() as i32;
    model.rotated_labels(-quarter_turns)
}

/// Row and column shifts (for [`LatticeModel::shifted`]) that keep every
/// inlier on the board.
pub fn allowed_shifts(
    board_size: BoardSize,
    assignments: &[Assignment],
) -> Option<(RangeInclusive<i32>, RangeInclusive<i32>)> {
    let mut inliers = assignments.iter().filter(|a| a.inlier).map(|a| a.coords);
    let first = inliers.next()?;
    let (mut lo, mut hi) = (first, first);
    for c in inliers {
        lo = GridCoords::new(lo.row.min(c.row), lo.col.min(c.col));
        hi = GridCoords::new(hi.row.max(c.row), hi.col.max(c.col));
    }
    let m = board_size.max_index();
    Some((hi.row - m..=lo.row, hi.col - m..=lo.col))
}

/// Pick the whole-node translation that matches the most detections, then
/// shows the most intersections inside `frame`, then brings the lattice
/// centre closest to the frame centre.
pub fn align_extent(
    objective: &Objective<'_>,
    model: LatticeModel,
    frame: &Frame,
    margin: f32,
) -> LatticeModel {
    let Some(assignments) = objective.assign(&model) else {
        return model;
    };
    let Some((rows, cols)) = allowed_shifts(model.board_size, &assignments) else {
        return model;
    };
    let target = frame.center();

    let mut best = model;
    let mut best_key = (0usize, 0usize, f32::INFINITY);
    for d_row in rows {
        for d_col in cols.clone() {
            let candidate = model.shifted(d_row, d_col);
            let key = (
                objective.stats(&candidate).inliers,
                frame.visible_nodes(&candidate, margin),
                (candidate.center() - target).norm_squared(),
            );
            let better = key.0 > best_key.0
                || (key.0 == best_key.0 && key.1 > best_key.1)
                || (key.0 == best_key.0 && key.1 == best_key.1 && key.2 < best_key.2);
            if better {
                best = candidate;
                best_key = key;
            }
        }
    }
    best
}
