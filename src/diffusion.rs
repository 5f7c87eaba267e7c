use rayon::prelude::*;

use crate::deposit::CAP;
use crate::grid::Grid;

/// One 3x3 blur + evaporation pass from `src` into `dst`.
///
/// Each of the 8 Moore neighbors is weighted `diffusion / 8`, the cell itself
/// `1 - diffusion`, and the blend is scaled by `evap`. At the grid edge the
/// offset along the missing axis collapses to zero, so the edge row/column is
/// read again instead of wrapping or reflecting. Fields do not wrap even
/// though agents do; keep it that way.
///
/// `src` is never written, which makes the row-parallel pass safe.
pub fn diffuse_evaporate(src: &Grid<f32>, dst: &mut Grid<f32>, diffusion: f32, evap: f32) {
    let w = src.w;
    let h = src.h;
    debug_assert_eq!((dst.w, dst.h), (w, h));
    if w == 0 || h == 0 {
        return;
    }
    let a = diffusion / 8.0;
    let center = 1.0 - 8.0 * a;
    let s = &src.data;

    dst.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let up = if y == 0 { 0 } else { w };
        let down = if y == h - 1 { 0 } else { w };
        let base = y * w;
        for x in 0..w {
            let i = base + x;
            let left = if x == 0 { 0 } else { 1 };
            let right = if x == w - 1 { 0 } else { 1 };

            let n = s[i - up - left] + s[i - up] + s[i - up + right]
                + s[i - left] + s[i + right]
                + s[i + down - left] + s[i + down] + s[i + down + right];
            let v = s[i] * center + a * n;
            row[x] = (v * evap).clamp(0.0, CAP);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterned(w: usize, h: usize) -> Grid<f32> {
        let mut g = Grid::new(w, h);
        for (i, v) in g.data.iter_mut().enumerate() {
            *v = ((i * 37) % 11) as f32 / 10.0;
        }
        g
    }

    #[test]
    fn zero_diffusion_only_scales_by_evaporation() {
        let src = patterned(9, 6);
        let mut dst = Grid::new(9, 6);
        diffuse_evaporate(&src, &mut dst, 0.0, 0.9);
        for (a, b) in src.data.iter().zip(dst.data.iter()) {
            assert!((a * 0.9 - b).abs() < 1e-6);
        }
    }

    #[test]
    fn uniform_field_is_a_fixed_point_without_evaporation() {
        let mut src = Grid::new(12, 7);
        src.data.fill(0.6);
        let mut dst = Grid::new(12, 7);
        diffuse_evaporate(&src, &mut dst, 0.8, 1.0);
        assert!(dst.data.iter().all(|&v| (v - 0.6).abs() < 1e-6));
    }

    #[test]
    fn source_is_left_untouched() {
        let src = patterned(5, 5);
        let before = src.clone();
        let mut dst = Grid::new(5, 5);
        diffuse_evaporate(&src, &mut dst, 0.5, 0.95);
        assert_eq!(src, before);
    }

    #[test]
    fn point_spreads_evenly_to_moore_neighbors() {
        let mut src = Grid::new(5, 5);
        src.set(2, 2, 1.0);
        let mut dst = Grid::new(5, 5);
        diffuse_evaporate(&src, &mut dst, 0.4, 1.0);
        assert!((dst.get(2, 2) - 0.6).abs() < 1e-6);
        for (x, y) in [(1, 1), (2, 1), (3, 1), (1, 2), (3, 2), (1, 3), (2, 3), (3, 3)] {
            assert!((dst.get(x, y) - 0.05).abs() < 1e-6);
        }
        let total: f32 = dst.data.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn corner_rereads_itself_for_missing_neighbors() {
        let mut src = Grid::new(4, 4);
        src.set(0, 0, 1.0);
        let mut dst = Grid::new(4, 4);
        diffuse_evaporate(&src, &mut dst, 0.8, 1.0);
        // Off-grid offsets collapse to zero: the corner reads itself 3 extra
        // times, its edge neighbors read it twice.
        let a = 0.8 / 8.0;
        assert!((dst.get(0, 0) - (1.0 - 5.0 * a)).abs() < 1e-6);
        assert!((dst.get(1, 0) - 2.0 * a).abs() < 1e-6);
        assert!((dst.get(0, 1) - 2.0 * a).abs() < 1e-6);
        assert!((dst.get(1, 1) - a).abs() < 1e-6);
        assert_eq!(dst.get(2, 2), 0.0);
    }
}
