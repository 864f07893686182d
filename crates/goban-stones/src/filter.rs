use goban_core::StoneDetection;
use log::debug;

use crate::blob::Blob;
use crate::params::StoneFilterParams;

/// Result of filtering a blob population.
#[derive(Clone, Debug, Default)]
pub struct FilterOutcome {
    pub stones: Vec<StoneDetection>,
    /// Median blob size in pixels (the expected stone size).
    pub median_pixels: f32,
    pub rejected: usize,
}

/// Keeps blobs that look like the dominant stone size and shape.
#[derive(Clone, Debug)]
pub struct StoneFilter {
    params: StoneFilterParams,
}

impl StoneFilter {
    pub fn new(params: StoneFilterParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StoneFilterParams {
        &self.params
    }

    pub fn filter(&self, blobs: &[Blob]) -> FilterOutcome {
        if blobs.is_empty() {
            return FilterOutcome::default();
        }

        // Most blobs on a photographed board are stones, so the median blob
        // is taken as the reference stone.
        let mut counts: Vec<usize> = blobs.iter().map(|b| b.pixel_count).collect();
        counts.sort_unstable();
        let median = counts[counts.len() / 2] as f32;

        let mut stones = Vec::with_capacity(blobs.len());
        for blob in blobs {
            if let Some(confidence) = self.score(blob, median) {
                stones.push(StoneDetection {
                    center: blob.centroid,
                    radius: blob.radius(),
                    confidence,
                });
            }
        }

        let rejected = blobs.len() - stones.len();
        debug!(
            "stone filter kept {}/{} blobs (median {:.0} px)",
            stones.len(),
            blobs.len(),
            median
        );
        FilterOutcome {
            stones,
            median_pixels: median,
            rejected,
        }
    }

    /// Confidence of a blob, `None` when it is rejected.
    fn score(&self, blob: &Blob, median: f32) -> Option<f32> {
        let p = &self.params;
        if p.reject_border_blobs && blob.touches_border {
            return None;
        }
        if median <= 0.0 {
            return None;
        }
        let ratio = blob.pixel_count as f32 / median;
        if ratio < p.min_size_ratio || ratio > p.max_size_ratio {
            return None;
        }
        let axis_ratio = blob.axis_ratio();
        if axis_ratio > p.max_axis_ratio {
            return None;
        }

        let size_dev = if ratio >= 1.0 {
            (ratio - 1.0) / (p.max_size_ratio - 1.0).max(1e-3)
        } else {
            (1.0 - ratio) / (1.0 - p.min_size_ratio).max(1e-3)
        };
        let shape_dev = (axis_ratio - 1.0) / (p.max_axis_ratio - 1.0).max(1e-3);
        let confidence =
            (1.0 - 0.5 * size_dev.clamp(0.0, 1.0)) * (1.0 - 0.5 * shape_dev.clamp(0.0, 1.0));

        (confidence >= p.min_confidence).then_some(confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    fn blob(pixel_count: usize, axis_ratio: f32, touches_border: bool) -> Blob {
        let minor = 5.0;
        Blob {
            pixel_count,
            centroid: Point2::new(10.0, 10.0),
            covariance: [0.0; 3],
            semi_major: minor * axis_ratio,
            semi_minor: minor,
            angle: 0.0,
            bbox: [0, 0, 0, 0],
            touches_border,
        }
    }

    #[test]
    fn rejects_outliers_around_median() {
        let blobs = vec![
            blob(100, 1.0, false),
            blob(104, 1.0, false),
            blob(96, 1.0, false),
            blob(30, 1.0, false),  // speck
            blob(450, 1.0, false), // merged stones / shadow
            blob(100, 3.0, false), // line fragment
            blob(100, 1.0, true),  // cut by the frame
        ];
        let out = StoneFilter::new(StoneFilterParams::default()).filter(&blobs);
        assert_eq!(out.median_pixels, 100.0);
        assert_eq!(out.stones.len(), 3);
        assert_eq!(out.rejected, 4);
        for s in &out.stones {
            assert!(s.confidence > 0.9, "confidence {}", s.confidence);
        }
    }

    #[test]
    fn confidence_drops_with_size_deviation() {
        let blobs = vec![blob(100, 1.0, false), blob(100, 1.0, false), blob(160, 1.0, false)];
        let out = StoneFilter::new(StoneFilterParams::default()).filter(&blobs);
        assert_eq!(out.stones.len(), 3);
        assert!(out.stones[2].confidence < out.stones[0].confidence);
    }

    #[test]
    fn low_confidence_never_survives() {
        let params = StoneFilterParams {
            min_confidence: 0.95,
            ..StoneFilterParams::default()
        };
        let blobs = vec![blob(100, 1.0, false), blob(100, 1.0, false), blob(140, 1.0, false)];
        let out = StoneFilter::new(params).filter(&blobs);
        assert_eq!(out.stones.len(), 2);
        assert!(out.stones.iter().all(|s| s.confidence >= 0.95));
    }

    #[test]
    fn border_blobs_kept_when_allowed() {
        let params = StoneFilterParams {
            reject_border_blobs: false,
            ..StoneFilterParams::default()
        };
        let out = StoneFilter::new(params).filter(&[blob(100, 1.0, true)]);
        assert_eq!(out.stones.len(), 1);
    }
}
