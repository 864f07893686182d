use crate::{board, core};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid RGB image buffer length (expected {expected} bytes, got {got})")]
    InvalidRgbBuffer { expected: usize, got: usize },

    #[error("invalid RGB image dimensions (width={width}, height={height})")]
    InvalidRgbDimensions { width: u32, height: u32 },

    #[error(transparent)]
    Detect(#[from] board::BoardDetectError),
}

/// Borrow an `image::RgbImage` as a `goban-core` view.
pub fn rgb_view(img: &::image::RgbImage) -> core::ImageView<'_> {
    core::ImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        format: core::PixelFormat::Rgb8,
        data: img.as_raw(),
    }
}

/// Borrow an `image::GrayImage` as a `goban-core` view.
///
/// Stone colour then rests on luminance alone.
pub fn gray_view(img: &::image::GrayImage) -> core::ImageView<'_> {
    core::ImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        format: core::PixelFormat::Gray8,
        data: img.as_raw(),
    }
}

/// Run the board detector end-to-end on a decoded photograph.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, params), fields(width = img.width(), height = img.height()))
)]
pub fn detect_board(
    img: &::image::RgbImage,
    params: board::BoardDetectorParams,
) -> Result<board::BoardDetectionResult, DetectError> {
    let detector = board::BoardDetector::new(params);
    Ok(detector.detect(&rgb_view(img))?)
}

/// Convenience overload using `BoardDetectorParams::default()`.
pub fn detect_board_default(
    img: &::image::RgbImage,
) -> Result<board::BoardDetectionResult, DetectError> {
    detect_board(img, board::BoardDetectorParams::default())
}

/// Decode any image the `image` crate reads, then detect.
pub fn detect_board_dynamic(
    img: &::image::DynamicImage,
    params: board::BoardDetectorParams,
) -> Result<board::BoardDetectionResult, DetectError> {
    detect_board(&img.to_rgb8(), params)
}

/// Build an `image::RgbImage` from a raw interleaved RGB buffer.
pub fn rgb_image_from_slice(
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<::image::RgbImage, DetectError> {
    let w = usize::try_from(width).ok();
    let h = usize::try_from(height).ok();
    let Some((w, h)) = w.zip(h) else {
        return Err(DetectError::InvalidRgbDimensions { width, height });
    };
    let Some(expected) = w.checked_mul(h).and_then(|n| n.checked_mul(3)) else {
        return Err(DetectError::InvalidRgbDimensions { width, height });
    };
    if pixels.len() != expected {
        return Err(DetectError::InvalidRgbBuffer {
            expected,
            got: pixels.len(),
        });
    }
    ::image::RgbImage::from_raw(width, height, pixels.to_vec())
        .ok_or(DetectError::InvalidRgbDimensions { width, height })
}

pub fn detect_board_from_rgb_u8(
    width: u32,
    height: u32,
    pixels: &[u8],
    params: board::BoardDetectorParams,
) -> Result<board::BoardDetectionResult, DetectError> {
    let img = rgb_image_from_slice(width, height, pixels)?;
    detect_board(&img, params)
}
