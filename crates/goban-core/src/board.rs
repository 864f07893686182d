use std::fmt;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::lattice::LatticeModel;

/// One of the three canonical go board sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BoardSize {
    Nine,
    Thirteen,
    Nineteen,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unsupported board size {0} (expected 9, 13 or 19)")]
pub struct BoardSizeError(pub u32);

impl BoardSize {
    pub const ALL: [BoardSize; 3] = [BoardSize::Nine, BoardSize::Thirteen, BoardSize::Nineteen];

    /// Number of lines in each direction.
    #[inline]
    pub fn lines(self) -> usize {
        match self {
            BoardSize::Nine => 9,
            BoardSize::Thirteen => 13,
            BoardSize::Nineteen => 19,
        }
    }

    /// Total number of intersections.
    #[inline]
    pub fn intersections(self) -> usize {
        self.lines() * self.lines()
    }

    /// Largest valid row/column index.
    #[inline]
    pub fn max_index(self) -> i32 {
        self.lines() as i32 - 1
    }
}

impl TryFrom<u32> for BoardSize {
    type Error = BoardSizeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            9 => Ok(BoardSize::Nine),
            13 => Ok(BoardSize::Thirteen),
            19 => Ok(BoardSize::Nineteen),
            other => Err(BoardSizeError(other)),
        }
    }
}

impl From<BoardSize> for u32 {
    fn from(size: BoardSize) -> u32 {
        size.lines() as u32
    }
}

impl fmt::Display for BoardSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{0}x{0}", self.lines())
    }
}

/// Integer lattice coordinates. `(0, 0)` is the intersection at the lattice origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoords {
    pub row: i32,
    pub col: i32,
}

impl GridCoords {
    #[inline]
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    #[inline]
    pub fn is_on_board(self, size: BoardSize) -> bool {
        let m = size.max_index();
        (0..=m).contains(&self.row) && (0..=m).contains(&self.col)
    }
}

/// What occupies an intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntersectionState {
    Empty,
    Black,
    White,
}

impl IntersectionState {
    pub fn is_stone(self) -> bool {
        !matches!(self, IntersectionState::Empty)
    }
}

/// A classified lattice intersection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intersection {
    pub coords: GridCoords,
    /// Image position, always `lattice.position(coords)`.
    pub position: Point2<f32>,
    pub state: IntersectionState,
    /// Classification confidence in `[0, 1]`.
    pub confidence: f32,
    /// The local patch matched no signature well.
    pub ambiguous: bool,
    /// Confidence fell below the assembler floor; `state` was forced to `Empty`.
    pub low_confidence: bool,
}

/// Final recognized board.
///
/// `intersections` is row-major and always holds exactly `board_size²` cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardState {
    pub board_size: BoardSize,
    pub top_left: Point2<f32>,
    pub bottom_right: Point2<f32>,
    pub lattice: LatticeModel,
    pub intersections: Vec<Intersection>,
    /// Overall confidence in `[0, 1]`.
    pub confidence: f32,
}

impl BoardState {
    pub fn get(&self, row: i32, col: i32) -> Option<&Intersection> {
        let coords = GridCoords::new(row, col);
        if !coords.is_on_board(self.board_size) {
            return None;
        }
        self.intersections
            .get(row as usize * self.board_size.lines() + col as usize)
    }

    pub fn state(&self, row: i32, col: i32) -> Option<IntersectionState> {
        self.get(row, col).map(|i| i.state)
    }

    /// Number of cells in the given state.
    pub fn count(&self, state: IntersectionState) -> usize {
        self.intersections
            .iter()
            .filter(|i| i.state == state)
            .count()
    }

    /// Row slices, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Intersection]> {
        self.intersections.chunks(self.board_size.lines())
    }

    /// Coordinates of every cell holding a stone of `state`.
    pub fn positions_of(&self, state: IntersectionState) -> Vec<GridCoords> {
        self.intersections
            .iter()
            .filter(|i| i.state == state)
            .map(|i| i.coords)
            .collect()
    }
}

/// Text diagram: `X` black, `O` white, `.` empty, `?` low-confidence empty.
impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for cell in row {
                let c = match cell.state {
                    IntersectionState::Black => 'X',
                    IntersectionState::White => 'O',
                    IntersectionState::Empty if cell.low_confidence => '?',
                    IntersectionState::Empty => '.',
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
