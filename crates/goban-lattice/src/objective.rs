use goban_core::{GridCoords, LatticeModel, StoneDetection};

/// Nearest-node assignment of one detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Assignment {
    pub coords: GridCoords,
    pub distance_sq: f32,
    pub inlier: bool,
}

/// Summary of a lattice against the detection set.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FitStats {
    /// Truncated weighted objective.
    pub objective: f32,
    pub inliers: usize,
    /// Confidence-weighted RMS distance of inliers to their nodes, pixels.
    /// Outliers beyond the match radius do not contribute.
    pub rms: f32,
}

/// Confidence-weighted squared distance to the nearest on-board
/// intersection, truncated at the match radius.
#[derive(Clone, Copy, Debug)]
pub struct Objective<'a> {
    detections: &'a [StoneDetection],
    cap_sq: f32,
}

impl<'a> Objective<'a> {
    pub fn new(detections: &'a [StoneDetection], match_radius: f32) -> Self {
        Self {
            detections,
            cap_sq: match_radius * match_radius,
        }
    }

    pub fn detections(&self) -> &'a [StoneDetection] {
        self.detections
    }

    pub fn match_radius_sq(&self) -> f32 {
        self.cap_sq
    }

    #[inline]
    fn weight(d: &StoneDetection) -> f32 {
        d.confidence.max(0.0)
    }

    pub fn evaluate(&self, model: &LatticeModel) -> f32 {
        let mut total = 0.0f32;
        for d in self.detections {
            let dist_sq = match model.nearest(d.center) {
                Some((_, dist_sq)) => dist_sq.min(self.cap_sq),
                None => self.cap_sq,
            };
            total += Self::weight(d) * dist_sq;
        }
        total
    }

    /// `None` for a degenerate model.
    pub fn assign(&self, model: &LatticeModel) -> Option<Vec<Assignment>> {
        self.detections
            .iter()
            .map(|d| {
                let (coords, distance_sq) = model.nearest(d.center)?;
                Some(Assignment {
                    coords,
                    distance_sq,
                    inlier: distance_sq <= self.cap_sq,
                })
            })
            .collect()
    }

    pub fn stats(&self, model: &LatticeModel) -> FitStats {
        let Some(assignments) = self.assign(model) else {
            return FitStats {
                objective: self.detections.iter().map(Self::weight).sum::<f32>() * self.cap_sq,
                inliers: 0,
                rms: f32::INFINITY,
            };
        };
        let mut objective = 0.0f32;
        let mut inliers = 0usize;
        let mut wsum = 0.0f32;
        let mut wdist = 0.0f32;
        for (d, a) in self.detections.iter().zip(&assignments) {
            let w = Self::weight(d);
            objective += w * a.distance_sq.min(self.cap_sq);
            if a.inlier {
                inliers += 1;
                wsum += w;
                wdist += w * a.distance_sq;
            }
        }
        let rms = if wsum > 0.0 {
            (wdist / wsum).sqrt()
        } else {
            f32::INFINITY
        };
        FitStats {
            objective,
            inliers,
            rms,
        }
    }
}
