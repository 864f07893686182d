use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Errors raised when wrapping a caller-provided pixel buffer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid pixel buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },
    #[error("invalid image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
}

/// Memory layout of one pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Three interleaved bytes per pixel.
    Rgb8,
    /// One luminance byte per pixel.
    Gray8,
}

impl PixelFormat {
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Borrowed, row-major view of a decoded photograph.
#[derive(Clone, Copy, Debug)]
pub struct ImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    pub data: &'a [u8],
}

impl<'a> ImageView<'a> {
    /// Wrap a buffer, checking that its length matches the dimensions.
    pub fn new(
        width: usize,
        height: usize,
        format: PixelFormat,
        data: &'a [u8],
    ) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions { width, height });
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(format.channels()))
            .ok_or(ImageError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(ImageError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn rgb(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageError> {
        Self::new(width, height, PixelFormat::Rgb8, data)
    }

    pub fn gray(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageError> {
        Self::new(width, height, PixelFormat::Gray8, data)
    }

    /// RGB triple at an in-bounds pixel. Gray buffers replicate luminance.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let idx = y * self.width + x;
        match self.format {
            PixelFormat::Rgb8 => {
                let o = idx * 3;
                [self.data[o], self.data[o + 1], self.data[o + 2]]
            }
            PixelFormat::Gray8 => {
                let v = self.data[idx];
                [v, v, v]
            }
        }
    }

    /// Bounds-checked pixel access.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<[u8; 3]> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(self.pixel(x as usize, y as usize))
    }

    /// Nearest-pixel sample at a real-valued position.
    #[inline]
    pub fn sample_nearest(&self, p: Point2<f32>) -> Option<[u8; 3]> {
        self.get(p.x.round() as i32, p.y.round() as i32)
    }

    /// Whether `p` lies at least `margin` pixels inside the frame.
    pub fn contains(&self, p: Point2<f32>, margin: f32) -> bool {
        p.x >= margin
            && p.y >= margin
            && p.x <= self.width as f32 - 1.0 - margin
            && p.y <= self.height as f32 - 1.0 - margin
    }

    /// Iterate rows as raw byte slices.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.data.chunks_exact(self.width * self.format.channels())
    }
}

/// Owned pixel buffer, mostly used by callers that render or convert images.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// A buffer filled with one colour.
    pub fn filled_rgb(width: usize, height: usize, color: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            format: PixelFormat::Rgb8,
            data,
        }
    }

    pub fn view(&self) -> ImageView<'_> {
        ImageView {
            width: self.width,
            height: self.height,
            format: self.format,
            data: &self.data,
        }
    }

    /// Overwrite one pixel; out-of-bounds writes are ignored.
    pub fn put_rgb(&mut self, x: i32, y: i32, color: [u8; 3]) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        match self.format {
            PixelFormat::Rgb8 => self.data[idx * 3..idx * 3 + 3].copy_from_slice(&color),
            PixelFormat::Gray8 => self.data[idx] = luminance(color).round() as u8,
        }
    }
}

/// Rec.601 luma of an RGB triple, on the 0..255 scale.
#[inline]
pub fn luminance(px: [u8; 3]) -> f32 {
    0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        let data = [0u8; 11];
        let err = ImageView::rgb(2, 2, &data).unwrap_err();
        assert_eq!(
            err,
            ImageError::InvalidBuffer {
                expected: 12,
                got: 11
            }
        );
        assert!(matches!(
            ImageView::gray(0, 4, &[]),
            Err(ImageError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn gray_pixels_replicate_luminance() {
        let data = [10u8, 20, 30, 40];
        let view = ImageView::gray(2, 2, &data).expect("view");
        assert_eq!(view.pixel(1, 1), [40, 40, 40]);
        assert_eq!(view.get(2, 0), None);
        assert_eq!(view.sample_nearest(Point2::new(0.6, 0.4)), Some([20, 20, 20]));
    }

    #[test]
    fn put_rgb_ignores_out_of_bounds() {
        let mut buf = PixelBuffer::filled_rgb(3, 2, [1, 2, 3]);
        buf.put_rgb(2, 1, [9, 9, 9]);
        buf.put_rgb(-1, 0, [7, 7, 7]);
        buf.put_rgb(3, 0, [7, 7, 7]);
        let view = buf.view();
        assert_eq!(view.pixel(2, 1), [9, 9, 9]);
        assert_eq!(view.pixel(0, 0), [1, 2, 3]);
        assert_eq!(view.rows().count(), 2);
    }
}
