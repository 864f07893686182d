//! Go board recognition from a single photograph.
//!
//! [`BoardDetector`] runs the whole pipeline:
//! 1. Black stone candidates are found by `goban-stones`.
//! 2. `goban-lattice` fits a rotated square lattice for each board size and
//!    keeps the best and near-tied candidates.
//! 3. Tied candidates, and the whole-node placement of the board on its
//!    lattice, are decided by image support: how many intersections show a
//!    stone or a line crossing.
//! 4. [`IntersectionClassifier`] reads every intersection as Black, White or
//!    Empty, flagging patches that match no signature.
//! 5. [`BoardAssembler`] applies the confidence floor and builds the
//!    [`goban_core::BoardState`].
//!
//! Detection- and fit-level failures are returned as [`BoardDetectError`];
//! ambiguous intersections never fail a run.
//!
//! ## Quickstart
//!
//! ```no_run
//! use goban_board::BoardDetector;
//! use goban_core::ImageView;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (width, height) = (640, 480);
//! let pixels = vec![0u8; width * height * 3];
//! let view = ImageView::rgb(width, height, &pixels)?;
//!
//! let result = BoardDetector::default().detect(&view)?;
//! println!("{}", result.board);
//! println!("black area {}", result.score().black_area());
//! # Ok(())
//! # }
//! ```

mod assemble;
mod classify;
mod detector;
pub mod io;
mod score;
mod support;

pub use assemble::{AssemblerParams, BoardAssembler};
pub use classify::{IntersectionClassifier, IntersectionParams, PatchReading, StoneIndex};
pub use detector::{BoardDetectError, BoardDetectionResult, BoardDetector, BoardDetectorParams};
pub use io::{BoardConfigError, BoardDetectConfig};
pub use score::{count_territory, score, Owner, Score, Territory};
pub use support::{choose_by_support, place_by_support, Placement};
