//! Rotated square lattice fitting.
//!
//! Given stone centres, [`LatticeFitter`] searches for the similarity
//! transform `(a, b, x0, y0)` that maps integer intersection coordinates
//! onto the detections, once per candidate board size:
//!
//! 1. Seed one or more lattice bases (spacing and rotation modulo 90°) by
//!    voting over neighbour offsets, falling back to stone size and the
//!    dominant neighbour direction.
//! 2. Cyclic coordinate descent on the truncated, confidence-weighted
//!    squared distance to the nearest intersection.
//! 3. Closed-form least-squares polish on the matched detections.
//! 4. Canonical relabelling and placement of the finite board.
//!
//! The residual is the confidence-weighted RMS distance of inlier
//! detections divided by the fitted spacing. The best size is the one with
//! the lowest residual; near ties go to the candidate covering more of the
//! frame, then the larger board.

mod descent;
mod error;
mod extent;
mod fitter;
mod objective;
mod params;
mod seed;

pub use descent::{coordinate_descent, least_squares_step, polish, DescentOutcome, DescentSteps};
pub use error::{LatticeFitError, SizeResidual};
pub use extent::{align_extent, allowed_shifts, canonical, centred_start, Frame};
pub use fitter::{LatticeCandidate, LatticeFit, LatticeFitter};
pub use objective::{Assignment, FitStats, Objective};
pub use params::LatticeFitParams;
pub use seed::{basis_vote, rotation_seed, size_spacing, spacing_seed, LatticeBasis, LatticeSeed};
