use goban_core::BoardSize;
use serde::{Deserialize, Serialize};

/// Lattice search configuration.
///
/// Lengths ending in `_rel` are fractions of the lattice spacing.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LatticeFitParams {
    /// Candidate board sizes, fitted independently.
    pub board_sizes: Vec<BoardSize>,

    /// Initial step for `a` and `b`, relative to the seed spacing.
    pub scale_step_rel: f32,
    /// Initial step for the origin, relative to the seed spacing.
    pub origin_step_rel: f32,
    /// Descent stops once the `a`/`b` steps fall below this (pixels per lattice unit).
    pub scale_epsilon: f32,
    /// Descent stops once the origin steps fall below this (pixels).
    pub origin_epsilon: f32,
    /// Hard cap on full descent cycles.
    pub max_iterations: usize,
    /// Maximal assignment/solve rounds of the least-squares polish.
    pub polish_iterations: usize,

    /// A detection farther than this from its node is an outlier; its
    /// contribution to the objective is capped at this distance.
    pub match_radius_rel: f32,
    /// Accepted fits have `rms / spacing` at most this.
    pub max_residual_rel: f32,
    /// Accepted fits match at least this fraction of the detections.
    pub min_inlier_fraction: f32,
    /// Accepted fits keep the spacing within this fraction of their seed
    /// basis; voted bases stay within it of the stone-size spacing.
    pub spacing_tolerance_rel: f32,
    /// Candidates whose normalized residual is within this of the best are tied.
    pub tie_tolerance_rel: f32,
    /// Image-frame inset used when counting visible intersections.
    pub frame_margin_rel: f32,

    /// Stone diameter as a fraction of the spacing, used to turn stone
    /// radii into a spacing estimate.
    pub stone_diameter_rel: f32,
    /// Neighbours queried per detection when seeding spacing and rotation.
    pub seed_neighbors: usize,
    /// A neighbour offset counts for a basis (or the fallback seeds) when
    /// it is this close, in spacings, to a whole lattice step.
    pub seed_unit_tolerance: f32,
}

impl Default for LatticeFitParams {
    fn default() -> Self {
        Self {
            board_sizes: BoardSize::ALL.to_vec(),
            scale_step_rel: 0.1,
            origin_step_rel: 0.25,
            scale_epsilon: 0.01,
            origin_epsilon: 0.1,
            max_iterations: 1000,
            polish_iterations: 10,
            match_radius_rel: 0.4,
            max_residual_rel: 0.15,
            min_inlier_fraction: 0.75,
            spacing_tolerance_rel: 0.35,
            tie_tolerance_rel: 0.05,
            frame_margin_rel: 0.25,
            stone_diameter_rel: 0.92,
            seed_neighbors: 8,
            seed_unit_tolerance: 0.15,
        }
    }
}
