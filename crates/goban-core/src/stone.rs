use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A confidently detected black stone in image space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoneDetection {
    pub center: Point2<f32>,
    /// Area-equivalent radius in pixels.
    pub radius: f32,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
}
