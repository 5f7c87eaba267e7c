use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage};
use image::imageops::FilterType;
use rayon::prelude::*;
use thiserror::Error;

use crate::deposit::add_saturating;
use crate::grid::Grid;
use crate::rng::Rng;

#[derive(Debug, Error)]
pub enum BakeError {
    #[error("failed to load background image: {0}")]
    Image(#[from] image::ImageError),
    #[error("background image has zero size")]
    Empty,
}

/// Per-cell luminance of a background image, letterboxed into the grid.
#[derive(Clone, Debug)]
pub struct Brightness {
    pub grid: Grid<f32>,
}

impl Brightness {
    pub fn open(path: &Path, w: usize, h: usize) -> Result<Self, BakeError> {
        let img = image::open(path)?;
        Self::from_image(&img, w, h)
    }

    pub fn from_bytes(bytes: &[u8], w: usize, h: usize) -> Result<Self, BakeError> {
        let img = image::load_from_memory(bytes)?;
        Self::from_image(&img, w, h)
    }

    /// Contain-fit the image into `w`x`h`, centered. Cells outside the
    /// fitted image read as black.
    pub fn from_image(img: &DynamicImage, w: usize, h: usize) -> Result<Self, BakeError> {
        let (iw, ih) = (img.width(), img.height());
        if iw == 0 || ih == 0 || w == 0 || h == 0 {
            return Err(BakeError::Empty);
        }
        let s = (w as f32 / iw as f32).min(h as f32 / ih as f32);
        let fw = ((iw as f32 * s).round() as u32).clamp(1, w as u32);
        let fh = ((ih as f32 * s).round() as u32).clamp(1, h as u32);
        let ox = (w as u32 - fw) / 2;
        let oy = (h as u32 - fh) / 2;

        let fitted = img.resize_exact(fw, fh, FilterType::Triangle).to_rgb8();

        let mut grid = Grid::<f32>::new(w, h);
        grid.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            let y = y as u32;
            if y < oy || y >= oy + fh {
                return;
            }
            for x in ox..ox + fw {
                let p = fitted.get_pixel(x - ox, y - oy);
                let [r, g, b] = p.0;
                row[x as usize] =
                    (0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32) / 255.0;
            }
        });

        Ok(Self { grid })
    }

    /// Brightness of the built-in demo background, see [`sample_image`].
    pub fn sample(w: usize, h: usize, seed: u64) -> Result<Self, BakeError> {
        let img = sample_image(&mut Rng::new(seed));
        Self::from_image(&DynamicImage::ImageRgb8(img), w, h)
    }

    /// Add `strength` to repellent wherever brightness is above `threshold`
    /// (below it when `invert`).
    pub fn bake(&self, repel: &mut Grid<f32>, strength: f32, threshold: f32, invert: bool) {
        debug_assert_eq!(repel.len(), self.grid.len());
        for (i, &b) in self.grid.data.iter().enumerate() {
            let hit = if invert { b < threshold } else { b > threshold };
            if hit {
                add_saturating(repel, i, strength);
            }
        }
    }
}

// Demo background palette
const SAMPLE_W: u32 = 1024;
const SAMPLE_H: u32 = 576;
const GROUND: Rgb<u8> = Rgb([11, 15, 20]);
const WATER: Rgb<u8> = Rgb([200, 210, 220]);
const PARK: Rgb<u8> = Rgb([169, 184, 198]);
const ROAD: Rgb<u8> = Rgb([42, 50, 59]);

/// Synthetic 1024x576 map: a light coastline with rivers running into it and
/// scattered light parks (repellent when baked), plus one dark road that stays
/// passable.
pub fn sample_image(rng: &mut Rng) -> RgbImage {
    let mut img = RgbImage::from_pixel(SAMPLE_W, SAMPLE_H, GROUND);

    let mut coast = cubic([50.0, 400.0], [200.0, 320.0], [380.0, 380.0], [520.0, 340.0]);
    coast.extend(cubic([520.0, 340.0], [680.0, 300.0], [820.0, 360.0], [980.0, 300.0]));
    stroke(&mut img, &coast, 3.0, WATER);

    for i in 0..6 {
        let x = 200.0 + i as f32 * 120.0;
        let end = [x - 50.0, 300.0 + rng.next_f32() * 60.0];
        stroke(&mut img, &[[x, 0.0], end], 3.0, WATER);
    }

    for _ in 0..12 {
        let x = rng.range_f32(60.0, 960.0);
        let y = rng.range_f32(100.0, 480.0);
        let r = rng.range_f32(10.0, 40.0);
        disc(&mut img, x, y, r, PARK);
    }

    stroke(&mut img, &[[120.0, 520.0], [500.0, 300.0], [900.0, 260.0]], 10.0, ROAD);
    img
}

/// Cubic Bezier sampled as a polyline.
fn cubic(p0: [f32; 2], p1: [f32; 2], p2: [f32; 2], p3: [f32; 2]) -> Vec<[f32; 2]> {
    const SEGMENTS: usize = 48;
    (0..=SEGMENTS)
        .map(|i| {
            let t = i as f32 / SEGMENTS as f32;
            let u = 1.0 - t;
            let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            [
                a * p0[0] + b * p1[0] + c * p2[0] + d * p3[0],
                a * p0[1] + b * p1[1] + c * p2[1] + d * p3[1],
            ]
        })
        .collect()
}

/// Round-capped polyline of the given pixel width.
fn stroke(img: &mut RgbImage, pts: &[[f32; 2]], width: f32, color: Rgb<u8>) {
    let r = width / 2.0;
    for seg in pts.windows(2) {
        let [a, b] = [seg[0], seg[1]];
        let len = ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt();
        let n = len.ceil().max(1.0) as usize;
        for k in 0..=n {
            let t = k as f32 / n as f32;
            disc(img, a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t, r, color);
        }
    }
}

fn disc(img: &mut RgbImage, cx: f32, cy: f32, r: f32, color: Rgb<u8>) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let x0 = ((cx - r).floor() as i64).max(0);
    let x1 = ((cx + r).ceil() as i64).min(w - 1);
    let y0 = ((cy - r).floor() as i64).max(0);
    let y1 = ((cy + r).ceil() as i64).min(h - 1);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let (dx, dy) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
            if dx * dx + dy * dy <= r * r {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}
