//! Synthetic go board photographs.

#![allow(dead_code)]

use goban_core::{BoardSize, GridCoords, IntersectionState, LatticeModel, PixelBuffer, Point2};

pub const WOOD: [u8; 3] = [205, 165, 95];
pub const LINE: [u8; 3] = [70, 50, 30];
pub const BLACK: [u8; 3] = [20, 20, 20];
pub const WHITE: [u8; 3] = [240, 240, 240];

/// Stone radius as a fraction of the spacing.
pub const STONE_RADIUS_REL: f32 = 0.46;
/// Half the drawn line width, pixels.
pub const LINE_HALF_WIDTH: f32 = 1.5;

/// Stones on a board, row-major.
#[derive(Clone, Debug)]
pub struct Position {
    pub size: BoardSize,
    pub cells: Vec<IntersectionState>,
}

impl Position {
    /// `X` black, `O` white, anything else empty.
    pub fn from_diagram(size: BoardSize, rows: &[&str]) -> Self {
        let n = size.lines();
        assert_eq!(rows.len(), n);
        let mut cells = Vec::with_capacity(n * n);
        for row in rows {
            assert_eq!(row.len(), n, "row {row:?}");
            for ch in row.bytes() {
                cells.push(match ch {
                    b'X' => IntersectionState::Black,
                    b'O' => IntersectionState::White,
                    _ => IntersectionState::Empty,
                });
            }
        }
        Self { size, cells }
    }

    pub fn empty(size: BoardSize) -> Self {
        Self {
            size,
            cells: vec![IntersectionState::Empty; size.intersections()],
        }
    }

    pub fn set(&mut self, row: i32, col: i32, state: IntersectionState) {
        let n = self.size.lines();
        self.cells[row as usize * n + col as usize] = state;
    }

    pub fn state(&self, row: i32, col: i32) -> IntersectionState {
        if !GridCoords::new(row, col).is_on_board(self.size) {
            return IntersectionState::Empty;
        }
        self.cells[row as usize * self.size.lines() + col as usize]
    }

    /// Stones of each colour, labels turned by `quarter_turns` × 90°.
    pub fn stones_turned(&self, quarter_turns: i32) -> (Vec<GridCoords>, Vec<GridCoords>) {
        let m = self.size.max_index();
        let mut black = Vec::new();
        let mut white = Vec::new();
        for row in 0..=m {
            for col in 0..=m {
                let (mut r, mut c) = (row, col);
                for _ in 0..quarter_turns.rem_euclid(4) {
                    (r, c) = (c, m - r);
                }
                match self.state(row, col) {
                    IntersectionState::Black => black.push(GridCoords::new(r, c)),
                    IntersectionState::White => white.push(GridCoords::new(r, c)),
                    IntersectionState::Empty => {}
                }
            }
        }
        black.sort();
        white.sort();
        (black, white)
    }
}

/// Lattice of `size` with its centre on the image centre.
pub fn centred_lattice(
    size: BoardSize,
    spacing: f32,
    angle_deg: f32,
    width: usize,
    height: usize,
) -> LatticeModel {
    let mut model =
        LatticeModel::from_spacing_angle(size, spacing, angle_deg.to_radians(), Point2::origin());
    let c = model.center();
    model.origin = Point2::new(
        (width as f32 - 1.0) * 0.5 - c.x,
        (height as f32 - 1.0) * 0.5 - c.y,
    );
    model
}

/// Render wood, lines between the outermost intersections, and stones.
///
/// Pixel centres sit at integer coordinates.
pub fn render(truth: &LatticeModel, position: &Position, width: usize, height: usize) -> PixelBuffer {
    let mut buf = PixelBuffer::filled_rgb(width, height, WOOD);
    let s = truth.spacing();
    let m = truth.board_size.max_index();
    let reach = LINE_HALF_WIDTH / s;
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let Some((row, col)) = truth.to_lattice(Point2::new(x as f32, y as f32)) else {
                continue;
            };
            let (r, c) = (row.round() as i32, col.round() as i32);
            let stone = position.state(r, c);
            if stone.is_stone() {
                let d = s * (row - r as f32).hypot(col - c as f32);
                if d <= STONE_RADIUS_REL * s {
                    let color = if stone == IntersectionState::Black {
                        BLACK
                    } else {
                        WHITE
                    };
                    buf.put_rgb(x, y, color);
                    continue;
                }
            }
            let along_rows = row >= -reach && row <= m as f32 + reach;
            let along_cols = col >= -reach && col <= m as f32 + reach;
            let on_vertical = (0..=m).contains(&c) && (col - c as f32).abs() * s <= LINE_HALF_WIDTH;
            let on_horizontal = (0..=m).contains(&r) && (row - r as f32).abs() * s <= LINE_HALF_WIDTH;
            if (on_vertical && along_rows) || (on_horizontal && along_cols) {
                buf.put_rgb(x, y, LINE);
            }
        }
    }
    buf
}

/// Black discs of stone size at the given centres, on plain wood.
pub fn render_blobs(centres: &[Point2<f32>], radius: f32, width: usize, height: usize) -> PixelBuffer {
    let mut buf = PixelBuffer::filled_rgb(width, height, WOOD);
    for p in centres {
        let ri = radius.ceil() as i32 + 1;
        let (cx, cy) = (p.x.round() as i32, p.y.round() as i32);
        for y in cy - ri..=cy + ri {
            for x in cx - ri..=cx + ri {
                if (x as f32 - p.x).hypot(y as f32 - p.y) <= radius {
                    buf.put_rgb(x, y, BLACK);
                }
            }
        }
    }
    buf
}

/// Deterministic uniform numbers in `[0, 1)`.
pub struct Lcg(pub u64);

impl Lcg {
    pub fn next_f32(&mut self) -> f32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 40) as f32) / ((1u64 << 24) as f32)
    }
}
