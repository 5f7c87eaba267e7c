use rayon::prelude::*;

use crate::cities::City;
use crate::grid::{Grid, in_bounds};
use crate::mask::Mask;

// Color palette
const BACKGROUND: [u8; 4] = [11, 15, 20, 255];
const TUBE: [f32; 3] = [240.0, 245.0, 250.0];
const FOOD: [f32; 3] = [10.0, 160.0, 140.0];
const REPEL: [f32; 3] = [220.0, 0.0, 0.0];
const CITY: [u8; 4] = [130, 170, 255, 255];
const CITY_RIM: [u8; 4] = [42, 62, 102, 255];
const MASK_TINT: [f32; 3] = [255.0, 209.0, 102.0];

/// Alpha-blend `color` at `alpha` over an opaque pixel.
#[inline]
fn blend(out: &mut [u8], color: [f32; 3], alpha: f32) {
    let a = alpha.clamp(0.0, 1.0);
    for c in 0..3 {
        let v = out[c] as f32 + (color[c] - out[c] as f32) * a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
}

/// Composite snapshot: tubes above `threshold` in white, food in teal,
/// repellent in red, over a dark background.
pub fn render_fields(
    trail: &Grid<f32>,
    food: &Grid<f32>,
    repel: &Grid<f32>,
    threshold: f32,
) -> Vec<u8> {
    let w = trail.w;
    let h = trail.h;
    let mut rgba = vec![0u8; w * h * 4];

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let out = &mut row[x * 4..x * 4 + 4];
            out.copy_from_slice(&BACKGROUND);

            let f = food.get(x, y);
            if f > 0.02 {
                blend(out, FOOD, f * 0.8);
            }
            let r = repel.get(x, y);
            if r > 0.02 {
                blend(out, REPEL, r * 0.8);
            }
            let tr = trail.get(x, y);
            if tr > threshold {
                blend(out, TUBE, tr * 1.2);
            }
        }
    });

    rgba
}

/// Diagnostic: raw trail intensity as grayscale (CAP maps to white).
pub fn render_trail(trail: &Grid<f32>) -> Vec<u8> {
    let mut rgba = vec![0u8; trail.len() * 4];
    rgba.par_chunks_mut(4)
        .zip(trail.data.par_iter())
        .for_each(|(out, &v)| {
            let g = (v / 1.5 * 255.0).round().clamp(0.0, 255.0) as u8;
            out.copy_from_slice(&[g, g, g, 255]);
        });
    rgba
}

/// Tint the rasterized cells of enabled masks.
pub fn overlay_masks(rgba: &mut [u8], masks: &[Mask]) {
    for m in masks.iter().filter(|m| m.enabled) {
        if let Some(cells) = &m.cells {
            for &i in cells {
                let o = i as usize * 4;
                if let Some(out) = rgba.get_mut(o..o + 4) {
                    blend(out, MASK_TINT, 0.12);
                }
            }
        }
    }
}

/// Stamp each city as a small disc with a darker rim. Cities off the
/// grid draw only the part that overlaps it.
pub fn overlay_cities(rgba: &mut [u8], w: usize, h: usize, cities: &[City]) {
    const R: i64 = 2;
    for c in cities {
        // `as` saturates, and NaN maps to 0
        let cx = c.x.floor() as i64;
        let cy = c.y.floor() as i64;
        for dy in -R..=R {
            for dx in -R..=R {
                let d2 = dx * dx + dy * dy;
                if d2 > R * R {
                    continue;
                }
                let (x, y) = (cx.saturating_add(dx), cy.saturating_add(dy));
                if !in_bounds(x, y, w, h) {
                    continue;
                }
                let o = (y as usize * w + x as usize) * 4;
                let color = if d2 == R * R { CITY_RIM } else { CITY };
                rgba[o..o + 4].copy_from_slice(&color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tube_cells_are_brighter_than_background() {
        let mut trail = Grid::<f32>::new(4, 2);
        trail.set(1, 1, 1.0);
        let empty = Grid::<f32>::new(4, 2);
        let rgba = render_fields(&trail, &empty, &empty, 0.5);
        assert_eq!(&rgba[0..4], &BACKGROUND);
        let o = (4 + 1) * 4;
        assert!(rgba[o] > 200 && rgba[o + 3] == 255);
    }

    #[test]
    fn cities_clip_at_the_edge() {
        let mut rgba = vec![0u8; 5 * 5 * 4];
        overlay_cities(&mut rgba, 5, 5, &[City { x: 0.0, y: 0.0 }]);
        assert_eq!(&rgba[0..4], &CITY);
    }

    #[test]
    fn far_away_cities_are_skipped() {
        let mut rgba = vec![0u8; 8 * 8 * 4];
        let cities = [
            City { x: 3.0e9, y: 3.0 },
            City { x: -3.0e9, y: f32::MAX },
            City { x: f32::INFINITY, y: f32::NEG_INFINITY },
        ];
        overlay_cities(&mut rgba, 8, 8, &cities);
        assert!(rgba.iter().all(|&b| b == 0));
    }
}
