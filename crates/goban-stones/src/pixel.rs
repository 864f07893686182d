use goban_core::ImageView;
use serde::{Deserialize, Serialize};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::params::PixelClassifierParams;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelClass {
    /// Candidate black stone material.
    Dark,
    /// Candidate white stone material.
    Light,
    /// Board, lines, background, noise.
    Colored,
}

/// Per-pixel gray-level predicate.
#[derive(Clone, Copy, Debug)]
pub struct PixelClassifier {
    params: PixelClassifierParams,
}

impl PixelClassifier {
    pub fn new(params: PixelClassifierParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PixelClassifierParams {
        &self.params
    }

    #[inline]
    pub fn classify(&self, px: [u8; 3]) -> PixelClass {
        let [r, g, b] = px;
        let hi = r.max(g).max(b);
        let lo = r.min(g).min(b);
        if hi - lo > self.params.grayness_limit {
            return PixelClass::Colored;
        }
        if hi < self.params.black_threshold {
            PixelClass::Dark
        } else if lo > self.params.white_threshold {
            PixelClass::Light
        } else {
            PixelClass::Colored
        }
    }

    /// Classify the whole image, one row per task when `rayon` is enabled.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, img), fields(width = img.width, height = img.height))
    )]
    pub fn classify_image(&self, img: &ImageView<'_>) -> PixelMap {
        let mut classes = vec![PixelClass::Colored; img.width * img.height];

        #[cfg(feature = "rayon")]
        classes
            .par_chunks_mut(img.width)
            .enumerate()
            .for_each(|(y, row)| self.classify_row(img, y, row));

        #[cfg(not(feature = "rayon"))]
        classes
            .chunks_mut(img.width)
            .enumerate()
            .for_each(|(y, row)| self.classify_row(img, y, row));

        PixelMap {
            width: img.width,
            height: img.height,
            classes,
        }
    }

    fn classify_row(&self, img: &ImageView<'_>, y: usize, row: &mut [PixelClass]) {
        for (x, out) in row.iter_mut().enumerate() {
            *out = self.classify(img.pixel(x, y));
        }
    }
}

/// Row-major class label per pixel.
#[derive(Clone, Debug)]
pub struct PixelMap {
    pub width: usize,
    pub height: usize,
    pub classes: Vec<PixelClass>,
}

impl PixelMap {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> PixelClass {
        self.classes[y * self.width + x]
    }

    pub fn count(&self, class: PixelClass) -> usize {
        self.classes.iter().filter(|&&c| c == class).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goban_core::PixelBuffer;

    #[test]
    fn thresholds_and_grayness() {
        let c = PixelClassifier::new(PixelClassifierParams::default());
        assert_eq!(c.classify([20, 22, 25]), PixelClass::Dark);
        assert_eq!(c.classify([240, 238, 235]), PixelClass::Light);
        // Dark but tinted: dark wood grain or shadow on a coloured board.
        assert_eq!(c.classify([45, 10, 5]), PixelClass::Colored);
        assert_eq!(c.classify([205, 165, 95]), PixelClass::Colored);
        assert_eq!(c.classify([120, 120, 120]), PixelClass::Colored);
    }

    #[test]
    fn custom_thresholds_apply() {
        let c = PixelClassifier::new(PixelClassifierParams {
            black_threshold: 130,
            white_threshold: 100,
            grayness_limit: 0,
        });
        assert_eq!(c.classify([120, 120, 120]), PixelClass::Dark);
        assert_eq!(c.classify([140, 140, 140]), PixelClass::Light);
        assert_eq!(c.classify([140, 141, 140]), PixelClass::Colored);
    }

    #[test]
    fn classify_image_matches_per_pixel() {
        let mut buf = PixelBuffer::filled_rgb(5, 3, [200, 160, 90]);
        buf.put_rgb(1, 1, [10, 10, 10]);
        buf.put_rgb(4, 2, [250, 250, 250]);
        let c = PixelClassifier::new(PixelClassifierParams::default());
        let map = c.classify_image(&buf.view());
        assert_eq!(map.get(1, 1), PixelClass::Dark);
        assert_eq!(map.get(4, 2), PixelClass::Light);
        assert_eq!(map.count(PixelClass::Colored), 13);
    }
}
