use goban_core::{BoardSize, GridCoords, LatticeModel, StoneDetection};
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::descent::{coordinate_descent, polish, DescentOutcome, DescentSteps};
use crate::error::{LatticeFitError, SizeResidual};
use crate::extent::{align_extent, canonical, centred_start, Frame};
use crate::objective::Objective;
use crate::params::LatticeFitParams;
use crate::seed::{LatticeBasis, LatticeSeed};

/// Least-squares polish needs this many matched detections.
const MIN_POLISH_INLIERS: usize = 3;

/// Coverage fractions closer than this are considered equal.
const COVERAGE_EPSILON: f32 = 1e-3;

/// Fit of one candidate board size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatticeCandidate {
    pub model: LatticeModel,
    /// Truncated weighted objective at the final model.
    pub objective: f32,
    /// Confidence-weighted RMS distance of the inlier detections to their
    /// nodes, in pixels.
    pub rms: f32,
    /// `rms / spacing`: the weighted RMS inlier distance in units of the
    /// fitted spacing. Unitless; used for acceptance and ranking.
    pub residual: f32,
    pub inliers: usize,
    pub detections: usize,
    /// Fraction of the board's intersections inside the frame.
    pub coverage: f32,
    pub iterations: usize,
    pub converged: bool,
    pub accepted: bool,
}

impl LatticeCandidate {
    #[inline]
    pub fn board_size(&self) -> BoardSize {
        self.model.board_size
    }

    pub fn inlier_fraction(&self) -> f32 {
        if self.detections == 0 {
            0.0
        } else {
            self.inliers as f32 / self.detections as f32
        }
    }

    pub fn size_residual(&self) -> SizeResidual {
        SizeResidual {
            board_size: self.board_size(),
            residual: self.residual,
            inlier_fraction: self.inlier_fraction(),
            converged: self.converged,
        }
    }

    /// `true` when `self` should be preferred over `other` among tied fits.
    fn outranks(&self, other: &LatticeCandidate) -> bool {
        if (self.coverage - other.coverage).abs() > COVERAGE_EPSILON {
            return self.coverage > other.coverage;
        }
        self.board_size() > other.board_size()
    }
}

/// Result of a successful multi-size fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatticeFit {
    pub seed_spacing: f32,
    pub seed_rotation: f32,
    /// Accepted candidates within the tie tolerance of the best residual,
    /// most preferred first. Never empty. Candidates from different seed
    /// bases may describe different lattices of the same size.
    pub tied: Vec<LatticeCandidate>,
    /// Best fit of every board size over all seed bases, in parameter order.
    pub candidates: Vec<LatticeCandidate>,
}

impl LatticeFit {
    pub fn best(&self) -> &LatticeCandidate {
        &self.tied[0]
    }

    pub fn model(&self) -> &LatticeModel {
        &self.best().model
    }

    pub fn residuals(&self) -> Vec<SizeResidual> {
        self.candidates.iter().map(LatticeCandidate::size_residual).collect()
    }
}

/// `true` when `a` is the better report for its board size.
fn better_fit(a: &LatticeCandidate, b: &LatticeCandidate) -> bool {
    if a.accepted != b.accepted {
        return a.accepted;
    }
    if a.converged != b.converged {
        return a.converged;
    }
    a.residual < b.residual
}

/// Same size and the same four corner positions within a quarter spacing.
fn same_board(a: &LatticeCandidate, b: &LatticeCandidate) -> bool {
    if a.board_size() != b.board_size() {
        return false;
    }
    let m = a.board_size().max_index();
    let corners = |model: &LatticeModel| {
        [(0, 0), (0, m), (m, 0), (m, m)].map(|(r, c)| model.position(GridCoords::new(r, c)))
    };
    let tol = 0.25 * a.model.spacing();
    let theirs = corners(&b.model);
    corners(&a.model)
        .iter()
        .all(|p| theirs.iter().any(|q| (p - q).norm() <= tol))
}

/// Fits a rotated square lattice to stone detections for each candidate
/// board size and picks the best.
///
/// Every seed basis is tried for every size. The descent is started from
/// the basis rotation and, when that differs, from zero rotation; the
/// lower objective wins. Each run is finished by a closed-form polish, a
/// canonical quarter-turn relabelling and extent alignment against the
/// frame.
#[derive(Clone, Debug, Default)]
pub struct LatticeFitter {
    params: LatticeFitParams,
}

impl LatticeFitter {
    pub fn new(params: LatticeFitParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LatticeFitParams {
        &self.params
    }

    /// Fit every configured board size.
    ///
    /// `frame` is the image region used to place the board; without one the
    /// detections' bounding box grown by one spacing is used.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip(self, detections, frame), fields(detections = detections.len()))
    )]
    pub fn fit(
        &self,
        detections: &[StoneDetection],
        frame: Option<Frame>,
    ) -> Result<LatticeFit, LatticeFitError> {
        let seed = LatticeSeed::estimate(detections, &self.params).ok_or(
            LatticeFitError::NotEnoughDetections {
                found: detections.len(),
                required: 1,
            },
        )?;
        let frame = match frame {
            Some(f) => f,
            None => Frame::around(detections, seed.spacing).ok_or(
                LatticeFitError::NotEnoughDetections {
                    found: 0,
                    required: 1,
                },
            )?,
        };

        let jobs: Vec<(BoardSize, &LatticeBasis)> = self
            .params
            .board_sizes
            .iter()
            .flat_map(|&size| seed.bases.iter().map(move |basis| (size, basis)))
            .collect();
        #[cfg(feature = "rayon")]
        let runs: Vec<LatticeCandidate> = jobs
            .par_iter()
            .map(|&(size, basis)| self.fit_size(detections, basis, size, &frame))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let runs: Vec<LatticeCandidate> = jobs
            .iter()
            .map(|&(size, basis)| self.fit_size(detections, basis, size, &frame))
            .collect();

        for c in &runs {
            debug!(
                "{}: residual {:.4}, inliers {}/{}, coverage {:.2}, rotation {:.2}°, {} iterations{}{}",
                c.board_size(),
                c.residual,
                c.inliers,
                c.detections,
                c.coverage,
                c.model.rotation().to_degrees(),
                c.iterations,
                if c.converged { "" } else { ", not converged" },
                if c.accepted { ", accepted" } else { "" },
            );
        }

        let mut candidates: Vec<LatticeCandidate> = Vec::with_capacity(self.params.board_sizes.len());
        for run in &runs {
            match candidates.iter_mut().find(|c| c.board_size() == run.board_size()) {
                Some(c) if better_fit(run, c) => *c = run.clone(),
                Some(_) => {}
                None => candidates.push(run.clone()),
            }
        }

        let tied = self.select(&runs, &candidates)?;
        info!(
            "lattice fit: {} (residual {:.4}, spacing {:.2} px, rotation {:.2}°), {} tied",
            tied[0].board_size(),
            tied[0].residual,
            tied[0].model.spacing(),
            tied[0].model.rotation().to_degrees(),
            tied.len()
        );

        Ok(LatticeFit {
            seed_spacing: seed.spacing,
            seed_rotation: seed.rotation,
            tied,
            candidates,
        })
    }

    fn select(
        &self,
        runs: &[LatticeCandidate],
        candidates: &[LatticeCandidate],
    ) -> Result<Vec<LatticeCandidate>, LatticeFitError> {
        if !runs.is_empty() && runs.iter().all(|c| !c.converged) {
            let best_residual = runs
                .iter()
                .map(|c| c.residual)
                .fold(f32::INFINITY, f32::min);
            return Err(LatticeFitError::FitDidNotConverge { best_residual });
        }

        let best = runs
            .iter()
            .filter(|c| c.accepted)
            .map(|c| c.residual)
            .fold(f32::INFINITY, f32::min);
        if !best.is_finite() {
            return Err(LatticeFitError::NoAcceptableBoardSize {
                residuals: candidates.iter().map(LatticeCandidate::size_residual).collect(),
            });
        }

        let mut tied: Vec<LatticeCandidate> = Vec::new();
        for c in runs
            .iter()
            .filter(|c| c.accepted && c.residual <= best + self.params.tie_tolerance_rel)
        {
            match tied.iter_mut().find(|t| same_board(t, c)) {
                Some(t) if c.residual < t.residual => *t = c.clone(),
                Some(_) => {}
                None => tied.push(c.clone()),
            }
        }
        // Stable insertion keeps parameter order among exact ties.
        for i in 1..tied.len() {
            let mut j = i;
            while j > 0 && tied[j].outranks(&tied[j - 1]) {
                tied.swap(j, j - 1);
                j -= 1;
            }
        }
        Ok(tied)
    }

    fn descent_steps(&self, spacing: f32) -> DescentSteps {
        DescentSteps {
            scale_step: self.params.scale_step_rel * spacing,
            origin_step: self.params.origin_step_rel * spacing,
            scale_epsilon: self.params.scale_epsilon,
            origin_epsilon: self.params.origin_epsilon,
            max_iterations: self.params.max_iterations,
        }
    }

    /// One descent from a centred start, followed by the polish.
    fn descend(
        &self,
        objective: &Objective<'_>,
        steps: &DescentSteps,
        detections: &[StoneDetection],
        board_size: BoardSize,
        spacing: f32,
        rotation: f32,
    ) -> DescentOutcome {
        let start = centred_start(detections, board_size, spacing, rotation);
        let mut run = coordinate_descent(objective, start, steps);
        if let Some((model, value)) = polish(
            objective,
            run.model,
            MIN_POLISH_INLIERS,
            self.params.polish_iterations,
        ) {
            run.model = model;
            run.objective = value;
        }
        run
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, detections, basis, frame), fields(size = %board_size))
    )]
    fn fit_size(
        &self,
        detections: &[StoneDetection],
        basis: &LatticeBasis,
        board_size: BoardSize,
        frame: &Frame,
    ) -> LatticeCandidate {
        let p = &self.params;
        let objective = Objective::new(detections, p.match_radius_rel * basis.spacing);
        let steps = self.descent_steps(basis.spacing);

        let mut run = self.descend(&objective, &steps, detections, board_size, basis.spacing, basis.rotation);
        if basis.rotation.abs() > 1e-3 {
            let level = self.descend(&objective, &steps, detections, board_size, basis.spacing, 0.0);
            let better = (level.converged && !run.converged)
                || (level.converged == run.converged && level.objective < run.objective);
            if better {
                run = level;
            }
        }

        let margin = p.frame_margin_rel * basis.spacing;
        let model = align_extent(&objective, canonical(&run.model), frame, margin);
        let stats = objective.stats(&model);
        let spacing = model.spacing();
        let residual = if spacing > 0.0 {
            stats.rms / spacing
        } else {
            f32::INFINITY
        };

        let mut candidate = LatticeCandidate {
            model,
            objective: stats.objective,
            rms: stats.rms,
            residual,
            inliers: stats.inliers,
            detections: detections.len(),
            coverage: frame.visible_nodes(&model, margin) as f32 / board_size.intersections() as f32,
            iterations: run.iterations,
            converged: run.converged,
            accepted: false,
        };
        candidate.accepted = candidate.converged
            && candidate.inlier_fraction() >= p.min_inlier_fraction
            && candidate.residual <= p.max_residual_rel
            && (spacing / basis.spacing - 1.0).abs() <= p.spacing_tolerance_rel;
        candidate
    }
}
