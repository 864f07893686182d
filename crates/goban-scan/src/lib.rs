//! High-level facade crate for the `goban-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the pipeline crates
//! - (feature-gated) end-to-end helpers that take an `image::RgbImage` or a
//!   raw RGB buffer and return the recognized board
//!
//! ## Quickstart
//!
//! ```no_run
//! use goban_scan::detect;
//! use goban_scan::board::BoardDetectorParams;
//! use image::ImageReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = ImageReader::open("goban.jpg")?.decode()?.to_rgb8();
//! let result = detect::detect_board(&img, BoardDetectorParams::default())?;
//!
//! println!("{}", result.board);
//! println!("confidence {:.2}", result.board.confidence);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `goban_scan::core`: pixel views, lattice model, board state.
//! - `goban_scan::stones`: pixel classification, blob extraction, stone filter.
//! - `goban_scan::lattice`: board lattice fitting over stone centres.
//! - `goban_scan::board`: intersection reading, assembly, scoring, JSON config.
//! - `goban_scan::detect` (feature `image`): end-to-end helpers from `image::RgbImage`.

pub use goban_board as board;
pub use goban_core as core;
pub use goban_lattice as lattice;
pub use goban_stones as stones;

pub use goban_board::{BoardDetectError, BoardDetectionResult, BoardDetector, BoardDetectorParams};
pub use goban_core::{BoardSize, BoardState, GridCoords, Intersection, IntersectionState};

#[cfg(feature = "image")]
pub mod detect;
