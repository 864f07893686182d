//! Area counting on a recognized board.

use goban_core::{BoardSize, BoardState, GridCoords, IntersectionState};
use serde::{Deserialize, Serialize};

/// Who an empty intersection belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    Black,
    White,
    /// Reached by both colours, or by none.
    Neutral,
}

/// Ownership of every intersection, row-major.
///
/// Stones own their own intersection; empty regions belong to a colour only
/// when every stone bordering the region has that colour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    pub board_size: BoardSize,
    pub owners: Vec<Owner>,
}

impl Territory {
    pub fn owner(&self, row: i32, col: i32) -> Option<Owner> {
        if !GridCoords::new(row, col).is_on_board(self.board_size) {
            return None;
        }
        self.owners
            .get(row as usize * self.board_size.lines() + col as usize)
            .copied()
    }
}

/// Stones and territory per colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub black_stones: usize,
    pub white_stones: usize,
    pub black_territory: usize,
    pub white_territory: usize,
    pub neutral: usize,
}

impl Score {
    /// Stones plus territory.
    pub fn black_area(&self) -> usize {
        self.black_stones + self.black_territory
    }

    pub fn white_area(&self) -> usize {
        self.white_stones + self.white_territory
    }
}

fn owner_of(state: IntersectionState) -> Option<Owner> {
    match state {
        IntersectionState::Black => Some(Owner::Black),
        IntersectionState::White => Some(Owner::White),
        IntersectionState::Empty => None,
    }
}

/// Flood-fill each 4-connected empty region and assign it to the colour
/// that alone borders it. Low-confidence cells are already Empty.
pub fn count_territory(board: &BoardState) -> Territory {
    let n = board.board_size.lines();
    let cells: Vec<Option<Owner>> = board
        .intersections
        .iter()
        .map(|c| owner_of(c.state))
        .collect();
    let mut owners: Vec<Owner> = cells
        .iter()
        .map(|c| c.unwrap_or(Owner::Neutral))
        .collect();
    let mut visited = vec![false; cells.len()];
    let mut stack = Vec::new();
    let mut region = Vec::new();

    for start in 0..cells.len() {
        if visited[start] || cells[start].is_some() {
            continue;
        }
        visited[start] = true;
        stack.push(start);
        region.clear();
        let (mut black, mut white) = (false, false);

        while let Some(idx) = stack.pop() {
            region.push(idx);
            let (row, col) = (idx / n, idx % n);
            let mut neighbours = [None; 4];
            if row > 0 {
                neighbours[0] = Some(idx - n);
            }
            if row + 1 < n {
                neighbours[1] = Some(idx + n);
            }
            if col > 0 {
                neighbours[2] = Some(idx - 1);
            }
            if col + 1 < n {
                neighbours[3] = Some(idx + 1);
            }
            for next in neighbours.into_iter().flatten() {
                match cells[next] {
                    Some(Owner::Black) => black = true,
                    Some(Owner::White) => white = true,
                    Some(Owner::Neutral) => {}
                    None if !visited[next] => {
                        visited[next] = true;
                        stack.push(next);
                    }
                    None => {}
                }
            }
        }

        let owner = match (black, white) {
            (true, false) => Owner::Black,
            (false, true) => Owner::White,
            _ => Owner::Neutral,
        };
        for &idx in &region {
            owners[idx] = owner;
        }
    }

    Territory {
        board_size: board.board_size,
        owners,
    }
}

/// Count stones and territory of both colours.
pub fn score(board: &BoardState) -> Score {
    let territory = count_territory(board);
    let mut s = Score::default();
    for (cell, owner) in board.intersections.iter().zip(&territory.owners) {
        match (cell.state, owner) {
            (IntersectionState::Black, _) => s.black_stones += 1,
            (IntersectionState::White, _) => s.white_stones += 1,
            (IntersectionState::Empty, Owner::Black) => s.black_territory += 1,
            (IntersectionState::Empty, Owner::White) => s.white_territory += 1,
            (IntersectionState::Empty, Owner::Neutral) => s.neutral += 1,
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use goban_core::{Intersection, LatticeModel, Point2};

    /// Build a 9×9 board from a text diagram (`X` black, `O` white).
    fn board(rows: [&str; 9]) -> BoardState {
        let lattice = LatticeModel::new(BoardSize::Nine, 20.0, 0.0, Point2::new(0.0, 0.0));
        let intersections = lattice
            .intersections()
            .map(|(coords, position)| {
                let ch = rows[coords.row as usize].as_bytes()[coords.col as usize];
                let state = match ch {
                    b'X' => IntersectionState::Black,
                    b'O' => IntersectionState::White,
                    _ => IntersectionState::Empty,
                };
                Intersection {
                    coords,
                    position,
                    state,
                    confidence: 1.0,
                    ambiguous: false,
                    low_confidence: false,
                }
            })
            .collect();
        let (top_left, bottom_right) = lattice.corners();
        BoardState {
            board_size: BoardSize::Nine,
            top_left,
            bottom_right,
            lattice,
            intersections,
            confidence: 1.0,
        }
    }

    #[test]
    fn walls_split_the_board() {
        let b = board([
            "..X.O....",
            "..X.O....",
            "..X.O....",
            "..X.O....",
            "..X.O....",
            "..X.O....",
            "..X.O....",
            "..X.O....",
            "..X.O....",
        ]);
        let t = count_territory(&b);
        assert_eq!(t.owner(0, 0), Some(Owner::Black));
        assert_eq!(t.owner(4, 3), Some(Owner::Neutral));
        assert_eq!(t.owner(8, 8), Some(Owner::White));
        assert_eq!(t.owner(9, 0), None);

        let s = score(&b);
        assert_eq!(s.black_stones, 9);
        assert_eq!(s.white_stones, 9);
        assert_eq!(s.black_territory, 18);
        assert_eq!(s.white_territory, 36);
        assert_eq!(s.neutral, 9);
        assert_eq!(s.black_area(), 27);
        assert_eq!(s.white_area(), 45);
    }

    #[test]
    fn empty_board_is_neutral() {
        let s = score(&board(["........."; 9]));
        assert_eq!(s.neutral, 81);
        assert_eq!(s.black_area() + s.white_area(), 0);
    }

    #[test]
    fn eye_inside_a_group_belongs_to_it() {
        let b = board([
            ".........",
            ".XXX.....",
            ".X.X.....",
            ".XXX.....",
            ".........",
            ".........",
            "......O..",
            ".........",
            ".........",
        ]);
        let t = count_territory(&b);
        assert_eq!(t.owner(2, 2), Some(Owner::Black));
        assert_eq!(t.owner(0, 0), Some(Owner::Neutral));
        assert_eq!(score(&b).black_territory, 1);
    }
}
