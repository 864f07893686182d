//! Go board detection pipeline.
//!
//! This module wires together stone detection, the multi-size lattice fit,
//! image-support placement, per-intersection classification and board
//! assembly.

mod error;
mod params;
mod pipeline;
mod result;

pub use error::BoardDetectError;
pub use params::BoardDetectorParams;
pub use pipeline::BoardDetector;
pub use result::BoardDetectionResult;
