//! Per-intersection patch classification.
//!
//! Each lattice node is read from two sample patterns:
//! - a ring of points along the four diagonals, which avoid the board lines
//!   and sit inside a stone placed on the node;
//! - four short arms along the lattice axes, where an empty node shows the
//!   dark `+` of the crossing lines.
//!
//! A node with a stone detection nearby is Black without looking at pixels.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use goban_core::{
    luminance, GridCoords, ImageView, IntersectionState, LatticeModel, Point2, StoneDetection,
    Vector2,
};
use goban_stones::{PixelClass, PixelClassifier};
use kiddo::{KdTree, SquaredEuclidean};
use serde::{Deserialize, Serialize};

/// Sample geometry and decision thresholds, relative to the lattice spacing.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IntersectionParams {
    /// A stone detection within `stone_match_rel · spacing` marks the node Black.
    pub stone_match_rel: f32,
    pub inner_radius_rel: f32,
    pub outer_radius_rel: f32,
    /// Ring radii sampled between inner and outer, inclusive.
    pub ring_radii: usize,
    /// Angular half-width around each diagonal, radians.
    pub diagonal_spread: f32,
    pub directions_per_diagonal: usize,
    /// Arm sample distances along the lattice axes.
    pub cross_radii_rel: Vec<f32>,
    /// Luminance drop below the wood reference that counts as a line.
    pub line_contrast: f32,
    pub white_min_fraction: f32,
    pub black_min_fraction: f32,
    /// Confidence scale for Black read from pixels without a detection.
    pub undetected_black_weight: f32,
    /// Empty needs both light and dark fractions at or below this.
    pub empty_max_fraction: f32,
    /// Line fraction that makes a node count as visible board.
    pub line_support_fraction: f32,
    /// Fewer ring samples than this share inside the image is ambiguous.
    pub min_in_frame_fraction: f32,
}

impl Default for IntersectionParams {
    fn default() -> Self {
        Self {
            stone_match_rel: 0.35,
            inner_radius_rel: 0.18,
            outer_radius_rel: 0.38,
            ring_radii: 3,
            diagonal_spread: 0.3,
            directions_per_diagonal: 3,
            cross_radii_rel: vec![0.15, 0.25, 0.35],
            line_contrast: 20.0,
            white_min_fraction: 0.6,
            black_min_fraction: 0.6,
            undetected_black_weight: 0.8,
            empty_max_fraction: 0.2,
            line_support_fraction: 0.4,
            min_in_frame_fraction: 0.5,
        }
    }
}

/// Classification of one lattice node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchReading {
    pub coords: GridCoords,
    pub position: Point2<f32>,
    pub state: IntersectionState,
    pub confidence: f32,
    pub ambiguous: bool,
    /// Black because a stone detection sits on the node.
    pub detected: bool,
    /// Share of in-frame ring samples classified `Light`.
    pub light: f32,
    /// Share of in-frame ring samples classified `Dark`.
    pub dark: f32,
    /// Share of arm samples on a line, all four arms.
    pub line: f32,
    /// The node itself lies inside the image.
    pub in_frame: bool,
}

impl PatchReading {
    /// The node shows a stone or a line crossing.
    pub fn supports_board(&self, line_support_fraction: f32) -> bool {
        self.in_frame
            && !self.ambiguous
            && (self.state.is_stone() || self.line >= line_support_fraction)
    }
}

/// Nearest-detection lookup.
pub struct StoneIndex<'a> {
    stones: &'a [StoneDetection],
    tree: Option<KdTree<f32, 2>>,
}

impl<'a> StoneIndex<'a> {
    pub fn new(stones: &'a [StoneDetection]) -> Self {
        let tree = (!stones.is_empty()).then(|| {
            let coords: Vec<[f32; 2]> = stones.iter().map(|s| [s.center.x, s.center.y]).collect();
            let tree: KdTree<f32, 2> = (&coords).into();
            tree
        });
        Self { stones, tree }
    }

    /// Closest detection and its pixel distance.
    pub fn nearest(&self, p: Point2<f32>) -> Option<(&'a StoneDetection, f32)> {
        let tree = self.tree.as_ref()?;
        let n = tree.nearest_one::<SquaredEuclidean>(&[p.x, p.y]);
        let stone = self.stones.get(n.item as usize)?;
        Some((stone, n.distance.sqrt()))
    }
}

/// Ring direction in lattice units: `(col, row)` components of a unit vector.
type Direction = (f32, f32);

const ARMS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Reads every intersection of a fitted lattice.
#[derive(Clone, Debug)]
pub struct IntersectionClassifier {
    params: IntersectionParams,
    pixels: PixelClassifier,
    directions: Vec<Direction>,
}

impl IntersectionClassifier {
    pub fn new(params: IntersectionParams, pixels: PixelClassifier) -> Self {
        let per = params.directions_per_diagonal.max(1);
        let mut directions = Vec::with_capacity(4 * per);
        for k in 0..4 {
            let diagonal = FRAC_PI_4 + k as f32 * FRAC_PI_2;
            for j in 0..per {
                let t = if per == 1 {
                    0.0
                } else {
                    -1.0 + 2.0 * j as f32 / (per - 1) as f32
                };
                let (sin, cos) = (diagonal + t * params.diagonal_spread).sin_cos();
                directions.push((cos, sin));
            }
        }
        Self {
            params,
            pixels,
            directions,
        }
    }

    pub fn params(&self) -> &IntersectionParams {
        &self.params
    }

    fn ring_radii(&self) -> impl Iterator<Item = f32> + '_ {
        let n = self.params.ring_radii.max(1);
        let (lo, hi) = (self.params.inner_radius_rel, self.params.outer_radius_rel);
        (0..n).map(move |i| {
            if n == 1 {
                0.5 * (lo + hi)
            } else {
                lo + (hi - lo) * i as f32 / (n - 1) as f32
            }
        })
    }

    /// Read all `n²` board intersections, row-major.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, image, model, stones), fields(size = %model.board_size))
    )]
    pub fn classify(
        &self,
        image: &ImageView<'_>,
        model: &LatticeModel,
        stones: &StoneIndex<'_>,
    ) -> Vec<PatchReading> {
        model
            .intersections()
            .map(|(coords, _)| self.read(image, model, coords, stones))
            .collect()
    }

    /// Read the node at `coords`, which may lie outside the board.
    pub fn read(
        &self,
        image: &ImageView<'_>,
        model: &LatticeModel,
        coords: GridCoords,
        stones: &StoneIndex<'_>,
    ) -> PatchReading {
        let p = &self.params;
        let position = model.position(coords);
        let spacing = model.spacing();
        let col_axis = model.col_axis();
        let row_axis = model.row_axis();

        let mut total = 0usize;
        let mut light = 0usize;
        let mut dark = 0usize;
        let mut lum = Vec::with_capacity(self.directions.len() * p.ring_radii.max(1));
        for r in self.ring_radii() {
            for &(u, v) in &self.directions {
                total += 1;
                let q = position + (col_axis * u + row_axis * v) * r;
                let Some(px) = image.sample_nearest(q) else {
                    continue;
                };
                match self.pixels.classify(px) {
                    PixelClass::Light => light += 1,
                    PixelClass::Dark => dark += 1,
                    PixelClass::Colored => {}
                }
                lum.push(luminance(px));
            }
        }

        let in_frame = image.contains(position, 0.0);
        let mut reading = PatchReading {
            coords,
            position,
            state: IntersectionState::Empty,
            confidence: 0.0,
            ambiguous: true,
            detected: false,
            light: 0.0,
            dark: 0.0,
            line: 0.0,
            in_frame,
        };
        let seen = lum.len();
        if !in_frame || (seen as f32) < p.min_in_frame_fraction * total as f32 || seen == 0 {
            return reading;
        }
        reading.light = light as f32 / seen as f32;
        reading.dark = dark as f32 / seen as f32;

        lum.sort_by(|a, b| a.total_cmp(b));
        let wood = lum[seen / 2];
        let (line_all, line_on_board) = self.line_fractions(image, model, coords, wood);
        reading.line = line_all;

        let near = stones
            .nearest(position)
            .filter(|(_, d)| *d <= p.stone_match_rel * spacing);
        let strongest = reading.light.max(reading.dark);
        let (state, confidence, ambiguous) = if let Some((stone, _)) = near {
            reading.detected = true;
            (
                IntersectionState::Black,
                stone.confidence.max(reading.dark),
                false,
            )
        } else if reading.light >= p.white_min_fraction {
            (IntersectionState::White, reading.light, false)
        } else if reading.dark >= p.black_min_fraction {
            (
                IntersectionState::Black,
                p.undetected_black_weight * reading.dark,
                false,
            )
        } else if strongest <= p.empty_max_fraction {
            // Plain wood without a crossing is no evidence of an empty point.
            (
                IntersectionState::Empty,
                (1.0 - strongest) * line_on_board,
                false,
            )
        } else {
            (IntersectionState::Empty, 0.3 * (1.0 - strongest), true)
        };
        reading.state = state;
        reading.confidence = confidence.clamp(0.0, 1.0);
        reading.ambiguous = ambiguous;
        reading
    }

    /// Line-hit shares over all arms and over the arms that point at the
    /// board. A missing on-board arm (edge, corner) is not counted.
    fn line_fractions(
        &self,
        image: &ImageView<'_>,
        model: &LatticeModel,
        coords: GridCoords,
        wood: f32,
    ) -> (f32, f32) {
        let spacing = model.spacing();
        if spacing <= 0.0 {
            return (0.0, 0.0);
        }
        let mut all = (0usize, 0usize);
        let mut on_board = (0usize, 0usize);
        let position = model.position(coords);
        for (d_row, d_col) in ARMS {
            let axis = model.row_axis() * d_row as f32 + model.col_axis() * d_col as f32;
            let along = axis / spacing;
            let across = Vector2::new(-along.y, along.x);
            let towards_board =
                GridCoords::new(coords.row + d_row, coords.col + d_col).is_on_board(model.board_size);
            for &r in &self.params.cross_radii_rel {
                let q = position + axis * r;
                let Some(darkest) = [-1.0f32, 0.0, 1.0]
                    .iter()
                    .map(|&t| image.sample_nearest(q + across * t).map(luminance))
                    .collect::<Option<Vec<f32>>>()
                    .and_then(|v| v.into_iter().reduce(f32::min))
                else {
                    continue;
                };
                let hit = wood - darkest >= self.params.line_contrast;
                all.0 += hit as usize;
                all.1 += 1;
                if towards_board {
                    on_board.0 += hit as usize;
                    on_board.1 += 1;
                }
            }
        }
        let share = |(hits, n): (usize, usize)| if n == 0 { 0.0 } else { hits as f32 / n as f32 };
        (share(all), share(on_board))
    }
}
