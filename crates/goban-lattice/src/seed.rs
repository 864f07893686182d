//! Initial spacing and rotation guesses for the descent.

use std::collections::HashSet;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use goban_core::StoneDetection;
use kiddo::{KdTree, SquaredEuclidean};
use log::debug;
use nalgebra::Vector2;

use crate::params::LatticeFitParams;

/// A lattice direction and spacing proposed by the neighbour offsets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatticeBasis {
    pub spacing: f32,
    /// Radians, folded into `(-π/4, π/4]`.
    pub rotation: f32,
    /// Confidence-weighted number of neighbour offsets that are whole
    /// lattice steps of this basis.
    pub score: f32,
}

/// Starting point shared by all board-size candidates.
#[derive(Clone, Debug, PartialEq)]
pub struct LatticeSeed {
    /// Spacing implied by the median stone size alone.
    pub size_spacing: f32,
    /// Spacing seed in pixels.
    pub spacing: f32,
    /// Dominant lattice direction in radians, folded into `(-π/4, π/4]`.
    pub rotation: f32,
    /// Every basis worth a descent, `spacing`/`rotation` first.
    ///
    /// Stones on a sublattice can fit more than one square lattice equally
    /// well. Stones on every fifth node of a 13x13 board in row-major order
    /// lie on the board lattice and on one turned by `atan(3/4)`; only the
    /// image tells them apart.
    pub bases: Vec<LatticeBasis>,
}

impl LatticeSeed {
    pub fn estimate(detections: &[StoneDetection], params: &LatticeFitParams) -> Option<Self> {
        let size_spacing = size_spacing(detections, params)?;
        let mut bases = basis_vote(detections, size_spacing, params);
        if bases.is_empty() {
            let spacing = spacing_seed(detections, size_spacing, params);
            let rotation = rotation_seed(detections, spacing, params).unwrap_or(0.0);
            bases.push(LatticeBasis {
                spacing,
                rotation,
                score: 0.0,
            });
        }
        let primary = bases[0];
        debug!(
            "lattice seed: spacing {:.2} px (stone size {:.2} px), rotation {:.2}°, {} bases",
            primary.spacing,
            size_spacing,
            primary.rotation.to_degrees(),
            bases.len()
        );
        Some(Self {
            size_spacing,
            spacing: primary.spacing,
            rotation: primary.rotation,
            bases,
        })
    }
}

/// Pairs farther apart than this many spacings may be knight-like offsets
/// such as (3, 4) whose length is also a whole number.
const MAX_SEED_UNITS: f32 = 2.0;

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Some(values[values.len() / 2])
}

/// Spacing estimated from the median stone radius.
pub fn size_spacing(detections: &[StoneDetection], params: &LatticeFitParams) -> Option<f32> {
    let mut radii: Vec<f32> = detections.iter().map(|d| d.radius).collect();
    let r = median(&mut radii)?;
    let s = 2.0 * r / params.stone_diameter_rel.max(1e-3);
    (s.is_finite() && s > 0.0).then_some(s)
}

fn neighbour_tree(detections: &[StoneDetection]) -> KdTree<f32, 2> {
    let coords = detections
        .iter()
        .map(|d| [d.center.x, d.center.y])
        .collect::<Vec<_>>();
    (&coords).into()
}

/// Median spacing implied by nearest-neighbour distances.
///
/// For every detection the closest neighbour at least one stone diameter
/// away whose distance is close to one or two stone-size spacings is
/// divided by that number. Falls back to `size_spacing` when no detection
/// has such a neighbour.
pub fn spacing_seed(
    detections: &[StoneDetection],
    size_spacing: f32,
    params: &LatticeFitParams,
) -> f32 {
    if detections.len() < 2 {
        return size_spacing;
    }
    let min_dist = size_spacing * params.stone_diameter_rel;
    let tree = neighbour_tree(detections);
    let k = (params.seed_neighbors + 1).min(detections.len());

    let mut estimates = Vec::with_capacity(detections.len());
    for (i, d) in detections.iter().enumerate() {
        let query = [d.center.x, d.center.y];
        let estimate = tree
            .nearest_n::<SquaredEuclidean>(&query, k)
            .into_iter()
            .filter(|n| n.item as usize != i)
            .map(|n| n.distance.sqrt())
            .filter(|&dist| dist >= min_dist)
            .find_map(|dist| {
                let units = dist / size_spacing;
                let whole = units.round();
                (whole <= MAX_SEED_UNITS && (units - whole).abs() <= params.seed_unit_tolerance)
                    .then(|| dist / whole)
            });
        if let Some(s) = estimate {
            estimates.push(s);
        }
    }

    median(&mut estimates).unwrap_or(size_spacing)
}

/// Confidence-weighted dominant neighbour direction modulo 90°.
///
/// Directions are averaged as unit vectors at four times their angle, so
/// the four lattice directions reinforce each other. Only pairs one or two
/// spacings apart contribute; diagonal neighbours do not.
pub fn rotation_seed(
    detections: &[StoneDetection],
    spacing: f32,
    params: &LatticeFitParams,
) -> Option<f32> {
    if detections.len() < 2 || spacing <= 0.0 {
        return None;
    }
    let tree = neighbour_tree(detections);
    let k = (params.seed_neighbors + 1).min(detections.len());

    let mut sum = Vector2::<f32>::zeros();
    let mut weight_sum = 0.0f32;
    for (i, d) in detections.iter().enumerate() {
        let query = [d.center.x, d.center.y];
        for n in tree.nearest_n::<SquaredEuclidean>(&query, k) {
            let j = n.item as usize;
            if j == i {
                continue;
            }
            let units = n.distance.sqrt() / spacing;
            if units < 0.5
                || units.round() > MAX_SEED_UNITS
                || (units - units.round()).abs() > params.seed_unit_tolerance
            {
                continue;
            }
            let delta = detections[j].center - d.center;
            let theta4 = 4.0 * delta.y.atan2(delta.x);
            // Closer pairs carry the direction more reliably.
            let w = d.confidence.max(0.0) * detections[j].confidence.max(0.0) / units.round();
            sum += w * Vector2::new(theta4.cos(), theta4.sin());
            weight_sum += w;
        }
    }

    if weight_sum <= 0.0 {
        return None;
    }
    let mean = sum / weight_sum;
    if mean.norm_squared() < 1e-6 {
        return None;
    }
    Some(0.25 * mean.y.atan2(mean.x))
}

/// Offsets up to this many stone-size spacings take part in the vote.
const MAX_OFFSET_UNITS: f32 = 3.2;

/// Largest `m² + n²` of a Gaussian integer `m + i·n` tried as the step
/// between two neighbours.
const MAX_STEP_NORM: i32 = 10;

/// Bases scoring at least this share of the best one stay in the running.
const BASIS_SCORE_RATIO: f32 = 0.9;

/// A further basis may deviate from the stone-size spacing by this much
/// more than the primary one.
const BASIS_SIZE_SLACK: f32 = 0.08;

const MAX_BASES: usize = 3;

/// Fold an angle into `(-π/4, π/4]`.
fn fold_quarter(theta: f32) -> f32 {
    let t = (theta + FRAC_PI_4).rem_euclid(FRAC_PI_2) - FRAC_PI_4;
    if t <= -FRAC_PI_4 + 1e-6 {
        t + FRAC_PI_2
    } else {
        t
    }
}

/// Confidence-weighted offsets from each detection to its near neighbours.
fn neighbour_offsets(
    detections: &[StoneDetection],
    size_spacing: f32,
    params: &LatticeFitParams,
) -> Vec<(Vector2<f32>, f32)> {
    if detections.len() < 2 {
        return Vec::new();
    }
    let min_dist = size_spacing * params.stone_diameter_rel;
    let max_dist = size_spacing * MAX_OFFSET_UNITS;
    let tree = neighbour_tree(detections);
    let k = (params.seed_neighbors + 1).min(detections.len());

    let mut offsets = Vec::new();
    for (i, d) in detections.iter().enumerate() {
        let query = [d.center.x, d.center.y];
        for n in tree.nearest_n::<SquaredEuclidean>(&query, k) {
            let j = n.item as usize;
            let dist = n.distance.sqrt();
            if j == i || dist < min_dist || dist > max_dist {
                continue;
            }
            let w = d.confidence.max(0.0) * detections[j].confidence.max(0.0);
            offsets.push((detections[j].center - d.center, w));
        }
    }
    offsets
}

/// Score `u` against the offsets and refine it by least squares.
///
/// An offset `d` is explained when `d / u` (as complex numbers) is within
/// `tolerance` of a non-zero Gaussian integer `g`. The refined basis
/// minimises `Σ w |d - g·u|²` over the explained offsets.
fn explain(u: Vector2<f32>, offsets: &[(Vector2<f32>, f32)], tolerance: f32) -> Option<LatticeBasis> {
    let norm = u.norm_squared();
    if norm <= 0.0 {
        return None;
    }
    let mut score = 0.0f32;
    let mut num = Vector2::<f32>::zeros();
    let mut den = 0.0f32;
    for &(d, w) in offsets {
        let gx = (d.x * u.x + d.y * u.y) / norm;
        let gy = (d.y * u.x - d.x * u.y) / norm;
        let (m, n) = (gx.round(), gy.round());
        if (m == 0.0 && n == 0.0) || (gx - m).hypot(gy - n) > tolerance {
            continue;
        }
        score += w;
        num += w * Vector2::new(d.x * m + d.y * n, d.y * m - d.x * n);
        den += w * (m * m + n * n);
    }
    if score <= 0.0 || den <= 0.0 {
        return None;
    }
    let refined = num / den;
    Some(LatticeBasis {
        spacing: refined.norm(),
        rotation: fold_quarter(refined.y.atan2(refined.x)),
        score,
    })
}

/// Lattice bases voted for by neighbour offsets.
///
/// Every offset between neighbouring stones is a Gaussian integer multiple
/// `(m + i·n)·u` of the basis vector `u`. Each small step `m + i·n`
/// proposes `u = d / (m + i·n)`; proposals near the stone-size spacing are
/// scored by how many offsets they explain and refined on those offsets.
///
/// The primary basis is the well-scored one closest to the stone-size
/// spacing. Distinct bases that score about as well and are about as close
/// follow it. Empty when no pair of stones is close enough to vote.
pub fn basis_vote(
    detections: &[StoneDetection],
    size_spacing: f32,
    params: &LatticeFitParams,
) -> Vec<LatticeBasis> {
    let offsets = neighbour_offsets(detections, size_spacing, params);
    if offsets.is_empty() || size_spacing <= 0.0 {
        return Vec::new();
    }

    let steps: Vec<(f32, f32)> = (1..=3)
        .flat_map(|m| (0..=3).map(move |n| (m, n)))
        .filter(|&(m, n)| m * m + n * n <= MAX_STEP_NORM)
        .map(|(m, n)| (m as f32, n as f32))
        .collect();

    // Proposals binned by 1° of direction and 2% of length.
    let mut seen = HashSet::new();
    let mut bases = Vec::new();
    for &(d, _) in &offsets {
        for &(m, n) in &steps {
            let norm = m * m + n * n;
            let u = Vector2::new((d.x * m + d.y * n) / norm, (d.y * m - d.x * n) / norm);
            let len = u.norm();
            if (len / size_spacing - 1.0).abs() > params.spacing_tolerance_rel {
                continue;
            }
            let theta = fold_quarter(u.y.atan2(u.x));
            let key = (
                theta.to_degrees().round() as i32,
                (len.ln() / 0.02).round() as i32,
            );
            if !seen.insert(key) {
                continue;
            }
            let u = Vector2::new(len * theta.cos(), len * theta.sin());
            if let Some(basis) = explain(u, &offsets, params.seed_unit_tolerance) {
                bases.push(basis);
            }
        }
    }

    let best = bases.iter().map(|b| b.score).fold(0.0f32, f32::max);
    let deviation = |b: &LatticeBasis| (b.spacing / size_spacing - 1.0).abs();
    let mut pool: Vec<LatticeBasis> = bases
        .into_iter()
        .filter(|b| b.score >= BASIS_SCORE_RATIO * best && deviation(b) <= params.spacing_tolerance_rel)
        .collect();
    pool.sort_by(|a, b| {
        deviation(a)
            .total_cmp(&deviation(b))
            .then(b.score.total_cmp(&a.score))
    });

    let Some(primary) = pool.first().copied() else {
        return Vec::new();
    };
    let limit = deviation(&primary) + BASIS_SIZE_SLACK;
    let mut kept = vec![primary];
    for b in pool.into_iter().skip(1) {
        if kept.len() >= MAX_BASES || deviation(&b) > limit {
            break;
        }
        let distinct = kept.iter().all(|k| {
            (fold_quarter(b.rotation - k.rotation)).abs().to_degrees() > 2.0
                || (b.spacing / k.spacing - 1.0).abs() > 0.05
        });
        if distinct {
            kept.push(b);
        }
    }
    kept
}
