use goban_core::{ImageView, StoneDetection};
use log::info;
use serde::{Deserialize, Serialize};

use crate::blob::{Blob, BlobExtractor};
use crate::filter::StoneFilter;
use crate::params::StoneDetectorParams;
use crate::pixel::{PixelClass, PixelClassifier};

/// Counters describing one stone detection pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoneStats {
    pub dark_pixels: usize,
    pub blobs: usize,
    pub rejected: usize,
    pub median_pixels: f32,
}

#[derive(Clone, Debug, Default)]
pub struct StoneDetectorOutput {
    pub stones: Vec<StoneDetection>,
    /// Blobs that reached the filter, kept for diagnostics.
    pub blobs: Vec<Blob>,
    pub stats: StoneStats,
}

/// Pixel classification, blob extraction and filtering in one call.
#[derive(Clone, Debug)]
pub struct StoneDetector {
    params: StoneDetectorParams,
    classifier: PixelClassifier,
    extractor: BlobExtractor,
    filter: StoneFilter,
}

impl StoneDetector {
    pub fn new(params: StoneDetectorParams) -> Self {
        let classifier = PixelClassifier::new(params.pixel);
        let extractor = BlobExtractor::new(params.blobs.clone());
        let filter = StoneFilter::new(params.filter.clone());
        Self {
            params,
            classifier,
            extractor,
            filter,
        }
    }

    pub fn params(&self) -> &StoneDetectorParams {
        &self.params
    }

    pub fn classifier(&self) -> &PixelClassifier {
        &self.classifier
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip(self, image), fields(width = image.width, height = image.height))
    )]
    pub fn detect(&self, image: &ImageView<'_>) -> StoneDetectorOutput {
        let map = self.classifier.classify_image(image);
        let dark_pixels = map.count(PixelClass::Dark);
        let blobs = self.extractor.extract(&map);
        let outcome = self.filter.filter(&blobs);

        info!(
            "stone detection: {} dark px, {} blobs, {} stones",
            dark_pixels,
            blobs.len(),
            outcome.stones.len()
        );

        StoneDetectorOutput {
            stats: StoneStats {
                dark_pixels,
                blobs: blobs.len(),
                rejected: outcome.rejected,
                median_pixels: outcome.median_pixels,
            },
            stones: outcome.stones,
            blobs,
        }
    }
}

impl Default for StoneDetector {
    fn default() -> Self {
        Self::new(StoneDetectorParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goban_core::PixelBuffer;

    const WOOD: [u8; 3] = [205, 165, 95];

    fn disc(buf: &mut PixelBuffer, cx: f32, cy: f32, r: f32, rgb: [u8; 3]) {
        for y in 0..buf.height as i32 {
            for x in 0..buf.width as i32 {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                if dx * dx + dy * dy <= r * r {
                    buf.put_rgb(x, y, rgb);
                }
            }
        }
    }

    #[test]
    fn finds_black_discs_and_ignores_white_and_noise() {
        let mut buf = PixelBuffer::filled_rgb(200, 120, WOOD);
        disc(&mut buf, 40.0, 40.0, 12.0, [20, 20, 20]);
        disc(&mut buf, 100.0, 40.0, 12.0, [25, 22, 20]);
        disc(&mut buf, 160.0, 80.0, 12.0, [18, 18, 18]);
        disc(&mut buf, 40.0, 90.0, 12.0, [240, 240, 240]);
        // Small dark speck and a thin dark line.
        disc(&mut buf, 120.0, 100.0, 2.0, [10, 10, 10]);
        for x in 60..140 {
            buf.put_rgb(x, 70, [15, 15, 15]);
        }

        let out = StoneDetector::default().detect(&buf.view());
        assert_eq!(out.stones.len(), 3);
        for (s, (ex, ey)) in out.stones.iter().zip([(40.0, 40.0), (100.0, 40.0), (160.0, 80.0)]) {
            assert!((s.center.x - ex).abs() < 0.5, "x {}", s.center.x);
            assert!((s.center.y - ey).abs() < 0.5, "y {}", s.center.y);
            assert!((s.radius - 12.0).abs() < 1.0, "radius {}", s.radius);
        }
        assert!(out.stats.rejected >= 1);
    }

    #[test]
    fn empty_board_yields_nothing() {
        let buf = PixelBuffer::filled_rgb(64, 64, WOOD);
        let out = StoneDetector::default().detect(&buf.view());
        assert!(out.stones.is_empty());
        assert_eq!(out.stats, StoneStats::default());
    }
}
