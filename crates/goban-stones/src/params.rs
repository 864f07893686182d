use serde::{Deserialize, Serialize};

/// Gray-level thresholds for per-pixel classification.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PixelClassifierParams {
    /// A pixel is `Dark` when every channel is below this value.
    pub black_threshold: u8,
    /// A pixel is `Light` when every channel is above this value.
    pub white_threshold: u8,
    /// Maximal spread between channels for `Dark`/`Light`; wood and other
    /// saturated colours stay `Colored`.
    pub grayness_limit: u8,
}

impl Default for PixelClassifierParams {
    fn default() -> Self {
        Self {
            black_threshold: 50,
            white_threshold: 170,
            grayness_limit: 20,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Four,
    #[default]
    Eight,
}

/// Connected-component labelling settings.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BlobParams {
    pub connectivity: Connectivity,
    /// Components with fewer pixels are dropped as noise.
    pub min_pixels: usize,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::Eight,
            min_pixels: 20,
        }
    }
}

/// Size and shape tolerances relative to the median blob.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoneFilterParams {
    /// Reject blobs with `pixels < min_size_ratio * median`.
    pub min_size_ratio: f32,
    /// Reject blobs with `pixels > max_size_ratio * median`.
    pub max_size_ratio: f32,
    /// Reject blobs whose semi-axis ratio exceeds this (elongated shapes).
    pub max_axis_ratio: f32,
    /// Detections below this confidence are discarded.
    pub min_confidence: f32,
    /// Drop blobs touching the image border (possibly cut-off stones).
    pub reject_border_blobs: bool,
}

impl Default for StoneFilterParams {
    fn default() -> Self {
        Self {
            min_size_ratio: 0.5,
            max_size_ratio: 2.0,
            max_axis_ratio: 1.8,
            min_confidence: 0.3,
            reject_border_blobs: true,
        }
    }
}

/// All stone-detection stages.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoneDetectorParams {
    pub pixel: PixelClassifierParams,
    pub blobs: BlobParams,
    pub filter: StoneFilterParams,
}
