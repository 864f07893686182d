//! Core types for go board recognition.
//!
//! This crate is small and purely geometric. It owns the caller-facing pixel
//! buffer views, the rotated-lattice model, and the board state produced at the
//! end of the pipeline. It does not know how stones are found or how a lattice
//! is fitted.

mod board;
mod image;
mod lattice;
mod logger;
mod stone;

pub use board::{
    BoardSize, BoardSizeError, BoardState, GridCoords, Intersection, IntersectionState,
};
pub use image::{luminance, ImageError, ImageView, PixelBuffer, PixelFormat};
pub use lattice::LatticeModel;
pub use stone::StoneDetection;

pub use nalgebra::{Point2, Vector2};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, parse_level, LOG_ENV};
