//! Black stone candidate detection.
//!
//! Three stages, each a pure function of the previous one's output:
//! 1. [`PixelClassifier`] labels every pixel `Dark`, `Light` or `Colored`
//!    using gray-level thresholds.
//! 2. [`BlobExtractor`] groups connected `Dark` pixels and fits each group's
//!    second-moment ellipse.
//! 3. [`StoneFilter`] keeps blobs close to the population's median size and
//!    roughly circular, producing [`goban_core::StoneDetection`]s.
//!
//! [`StoneDetector`] chains the three. The filter is deliberately strict: a
//! missed stone is recovered later by patch classification, while a noise
//! blob taken for a stone distorts the lattice fit.

mod blob;
mod detector;
mod filter;
mod params;
mod pixel;

pub use blob::{Blob, BlobExtractor};
pub use detector::{StoneDetector, StoneDetectorOutput, StoneStats};
pub use filter::{FilterOutcome, StoneFilter};
pub use params::{
    BlobParams, Connectivity, PixelClassifierParams, StoneDetectorParams, StoneFilterParams,
};
pub use pixel::{PixelClass, PixelClassifier, PixelMap};
