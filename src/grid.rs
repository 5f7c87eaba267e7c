/// Default grid width in cells.
pub const GRID_W: usize = 256;
/// Default grid height in cells.
pub const GRID_H: usize = 144;

/// Row-major flat grid. No per-cell objects, f32 friendly.
/// Dimensions are fixed at construction; linear index is `y * w + x`.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    pub data: Vec<T>,
    pub w: usize,
    pub h: usize,
}

impl<T: Copy + Default> Grid<T> {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            data: vec![T::default(); w * h],
            w,
            h,
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.w && y < self.h);
        y * self.w + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: T) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    /// Reset every cell to the default value without reallocating.
    pub fn fill_default(&mut self) {
        self.data.fill(T::default());
    }

    /// Whether signed cell coordinates fall on the grid.
    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        in_bounds(x, y, self.w, self.h)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Clamp a continuous coordinate pair onto a valid cell of a `w`x`h` grid.
/// Uses nearest-cell rounding; NaN lands on cell 0.
#[inline]
pub fn clamp_cell(x: f32, y: f32, w: usize, h: usize) -> (usize, usize) {
    let cx = x.round().clamp(0.0, (w - 1) as f32);
    let cy = y.round().clamp(0.0, (h - 1) as f32);
    (cx as usize, cy as usize)
}

/// Bounds test for signed cell coordinates on a `w`x`h` grid.
#[inline]
pub fn in_bounds(x: i64, y: i64, w: usize, h: usize) -> bool {
    x >= 0 && y >= 0 && x < w as i64 && y < h as i64
}

/// Interior bound `[1, w-2] x [1, h-2]` as inclusive f32 ranges.
/// Agents and deposits never touch the outermost ring of cells.
#[inline]
pub fn interior(w: usize, h: usize) -> ([f32; 2], [f32; 2]) {
    ([1.0, w as f32 - 2.0], [1.0, h as f32 - 2.0])
}

/// 8-connected neighbors, clipped at the grid edge (no wrapping).
pub fn neighbors8(x: usize, y: usize, w: usize, h: usize) -> impl Iterator<Item = (usize, usize)> {
    let offsets: [(i64, i64); 8] = [
        (-1, -1), (0, -1), (1, -1),
        (-1, 0),           (1, 0),
        (-1, 1),  (0, 1),  (1, 1),
    ];
    let mut out = [(0usize, 0usize); 8];
    let mut n = 0;
    for (dx, dy) in offsets {
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        if !in_bounds(nx, ny, w, h) {
            continue;
        }
        out[n] = (nx as usize, ny as usize);
        n += 1;
    }
    out.into_iter().take(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_index_is_row_major() {
        let g = Grid::<f32>::new(7, 3);
        assert_eq!(g.idx(0, 0), 0);
        assert_eq!(g.idx(6, 0), 6);
        assert_eq!(g.idx(2, 2), 16);
        assert_eq!(g.len(), 21);
    }

    #[test]
    fn corner_has_three_neighbors() {
        assert_eq!(neighbors8(0, 0, 5, 5).count(), 3);
        assert_eq!(neighbors8(4, 2, 5, 5).count(), 5);
        assert_eq!(neighbors8(2, 2, 5, 5).count(), 8);
    }

    #[test]
    fn contains_rejects_negative_and_past_the_edge() {
        let g = Grid::<u8>::new(4, 3);
        assert!(g.contains(0, 0));
        assert!(g.contains(3, 2));
        assert!(!g.contains(-1, 0));
        assert!(!g.contains(4, 0));
        assert!(!g.contains(0, 3));
        assert!(!g.contains(i64::MAX, i64::MIN));
    }

    #[test]
    fn clamp_cell_rounds_and_clamps() {
        assert_eq!(clamp_cell(-3.0, 2.4, 10, 10), (0, 2));
        assert_eq!(clamp_cell(2.6, 40.0, 10, 10), (3, 9));
        assert_eq!(clamp_cell(f32::NAN, 1.0, 10, 10).1, 1);
    }
}
