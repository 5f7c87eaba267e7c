use crate::grid::{Grid, clamp_cell};

/// Upper bound for every field cell.
pub const CAP: f32 = 1.5;

/// Saturating add into one cell: result is kept in `[0, CAP]`.
#[inline]
pub fn add_saturating(field: &mut Grid<f32>, i: usize, amount: f32) {
    field.data[i] = (field.data[i] + amount).clamp(0.0, CAP);
}

/// Add `amount` to every interior cell whose center lies within `radius`
/// of `(cx, cy)` (inclusive). Cost scales with `radius^2`.
pub fn deposit_circle(field: &mut Grid<f32>, cx: f32, cy: f32, radius: f32, amount: f32) {
    let w = field.w;
    let h = field.h;
    if w < 3 || h < 3 || !(radius >= 0.0) {
        return;
    }
    let r2 = radius * radius;

    // Bounding box clipped to the interior ring
    let x0 = ((cx - radius).floor() as i64).max(1);
    let x1 = ((cx + radius).floor() as i64).min(w as i64 - 2);
    let y0 = ((cy - radius).floor() as i64).max(1);
    let y1 = ((cy + radius).floor() as i64).min(h as i64 - 2);

    for y in y0..=y1 {
        let dy = y as f32 - cy;
        let dy2 = dy * dy;
        for x in x0..=x1 {
            let dx = x as f32 - cx;
            if dx * dx + dy2 <= r2 {
                let i = y as usize * w + x as usize;
                add_saturating(field, i, amount);
            }
        }
    }
}

/// Add `amount` at each listed linear index.
pub fn deposit_cells(field: &mut Grid<f32>, cells: &[u32], amount: f32) {
    for &i in cells {
        add_saturating(field, i as usize, amount);
    }
}

/// Read the field at the nearest cell to `(x, y)`, clamped onto the grid.
#[inline]
pub fn sample(field: &Grid<f32>, x: f32, y: f32) -> f32 {
    let (cx, cy) = clamp_cell(x, y, field.w, field.h);
    field.get(cx, cy)
}
