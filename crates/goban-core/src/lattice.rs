use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::board::{BoardSize, GridCoords};

/// Rotated square lattice in image space.
///
/// The linear part is constrained to rotation plus uniform scale,
/// `[[a, -b], [b, a]]`, so intersection `(row, col)` projects to
///
/// ```text
/// origin + (a·col − b·row, b·col + a·row)
/// ```
///
/// The spacing is `hypot(a, b)` and the rotation is `atan2(b, a)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatticeModel {
    pub board_size: BoardSize,
    pub a: f32,
    pub b: f32,
    /// Image position of intersection `(0, 0)`.
    pub origin: Point2<f32>,
}

impl LatticeModel {
    pub fn new(board_size: BoardSize, a: f32, b: f32, origin: Point2<f32>) -> Self {
        Self {
            board_size,
            a,
            b,
            origin,
        }
    }

    /// Build from spacing (pixels) and rotation (radians).
    pub fn from_spacing_angle(
        board_size: BoardSize,
        spacing: f32,
        angle: f32,
        origin: Point2<f32>,
    ) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(board_size, spacing * cos, spacing * sin, origin)
    }

    #[inline]
    pub fn spacing(&self) -> f32 {
        self.a.hypot(self.b)
    }

    /// Rotation angle in radians.
    #[inline]
    pub fn rotation(&self) -> f32 {
        self.b.atan2(self.a)
    }

    /// Image-space step for `col + 1`.
    #[inline]
    pub fn col_axis(&self) -> Vector2<f32> {
        Vector2::new(self.a, self.b)
    }

    /// Image-space step for `row + 1`.
    #[inline]
    pub fn row_axis(&self) -> Vector2<f32> {
        Vector2::new(-self.b, self.a)
    }

    /// Project real-valued lattice coordinates.
    #[inline]
    pub fn project(&self, row: f32, col: f32) -> Point2<f32> {
        Point2::new(
            self.origin.x + self.a * col - self.b * row,
            self.origin.y + self.b * col + self.a * row,
        )
    }

    #[inline]
    pub fn position(&self, coords: GridCoords) -> Point2<f32> {
        self.project(coords.row as f32, coords.col as f32)
    }

    /// Inverse projection, `(row, col)` as reals. `None` for a degenerate lattice.
    pub fn to_lattice(&self, p: Point2<f32>) -> Option<(f32, f32)> {
        let s2 = self.a * self.a + self.b * self.b;
        if s2 <= f32::EPSILON {
            return None;
        }
        let dx = p.x - self.origin.x;
        let dy = p.y - self.origin.y;
        let col = (self.a * dx + self.b * dy) / s2;
        let row = (-self.b * dx + self.a * dy) / s2;
        Some((row, col))
    }

    /// Nearest on-board intersection and its squared pixel distance.
    ///
    /// The axes are orthogonal, so clamping each rounded coordinate
    /// independently gives the nearest in-bounds node.
    pub fn nearest(&self, p: Point2<f32>) -> Option<(GridCoords, f32)> {
        let (row, col) = self.to_lattice(p)?;
        let m = self.board_size.max_index();
        let coords = GridCoords::new(
            (row.round() as i32).clamp(0, m),
            (col.round() as i32).clamp(0, m),
        );
        let q = self.position(coords);
        Some((coords, (p - q).norm_squared()))
    }

    /// Image position of the lattice centre.
    pub fn center(&self) -> Point2<f32> {
        let h = self.board_size.max_index() as f32 * 0.5;
        self.project(h, h)
    }

    /// `(0, 0)` and `(n-1, n-1)` image positions.
    pub fn corners(&self) -> (Point2<f32>, Point2<f32>) {
        let m = self.board_size.max_index();
        (
            self.position(GridCoords::new(0, 0)),
            self.position(GridCoords::new(m, m)),
        )
    }

    /// All on-board intersections, row-major.
    pub fn intersections(&self) -> impl Iterator<Item = (GridCoords, Point2<f32>)> + '_ {
        let n = self.board_size.lines() as i32;
        (0..n).flat_map(move |row| {
            (0..n).map(move |col| {
                let c = GridCoords::new(row, col);
                (c, self.position(c))
            })
        })
    }

    /// Same node set, axes relabelled by `quarter_turns` × 90° about the centre.
    pub fn rotated_labels(&self, quarter_turns: i32) -> Self {
        let center = self.center();
        let (mut a, mut b) = (self.a, self.b);
        for _ in 0..quarter_turns.rem_euclid(4) {
            // (a, b) -> (-b, a) rotates both axes by +90°.
            (a, b) = (-b, a);
        }
        let h = self.board_size.max_index() as f32 * 0.5;
        let mut out = Self::new(self.board_size, a, b, Point2::origin());
        let offset = out.project(h, h);
        out.origin = Point2::new(center.x - offset.x, center.y - offset.y);
        out
    }

    /// Translate by whole rows/columns.
    pub fn shifted(&self, d_row: i32, d_col: i32) -> Self {
        let delta = self.row_axis() * d_row as f32 + self.col_axis() * d_col as f32;
        Self {
            origin: self.origin + delta,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tilted() -> LatticeModel {
        LatticeModel::from_spacing_angle(
            BoardSize::Nine,
            40.0,
            15f32.to_radians(),
            Point2::new(100.0, 60.0),
        )
    }

    #[test]
    fn project_and_invert_agree() {
        let m = tilted();
        let p = m.project(3.0, 5.0);
        let (row, col) = m.to_lattice(p).expect("invertible");
        assert_abs_diff_eq!(row, 3.0, epsilon = 1e-4);
        assert_abs_diff_eq!(col, 5.0, epsilon = 1e-4);
        assert_abs_diff_eq!(m.spacing(), 40.0, epsilon = 1e-4);
        assert_abs_diff_eq!(m.rotation(), 15f32.to_radians(), epsilon = 1e-6);
    }

    #[test]
    fn nearest_clamps_to_board() {
        let m = LatticeModel::new(BoardSize::Nine, 10.0, 0.0, Point2::new(0.0, 0.0));
        let (c, d2) = m.nearest(Point2::new(-12.0, 41.0)).expect("nearest");
        assert_eq!(c, GridCoords::new(4, 0));
        assert_abs_diff_eq!(d2, 145.0, epsilon = 1e-3);
        let (c, _) = m.nearest(Point2::new(500.0, 500.0)).expect("nearest");
        assert_eq!(c, GridCoords::new(8, 8));
    }

    #[test]
    fn degenerate_lattice_has_no_inverse() {
        let m = LatticeModel::new(BoardSize::Nine, 0.0, 0.0, Point2::origin());
        assert!(m.to_lattice(Point2::new(1.0, 1.0)).is_none());
    }

    #[test]
    fn relabelling_keeps_node_set() {
        let m = tilted();
        let r = m.rotated_labels(1);
        assert_abs_diff_eq!(r.spacing(), m.spacing(), epsilon = 1e-4);
        for (_, p) in m.intersections() {
            let (_, d2) = r.nearest(p).expect("nearest");
            assert!(d2 < 1e-3, "node {p:?} missing after relabel (d2={d2})");
        }
    }

    #[test]
    fn shift_moves_whole_steps() {
        let m = tilted();
        let s = m.shifted(1, -2);
        let p = s.position(GridCoords::new(0, 0));
        let q = m.project(1.0, -2.0);
        assert_abs_diff_eq!(p.x, q.x, epsilon = 1e-4);
        assert_abs_diff_eq!(p.y, q.y, epsilon = 1e-4);
        assert_eq!(m.intersections().count(), 81);
    }
}
