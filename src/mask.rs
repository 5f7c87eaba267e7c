use serde::Serialize;
use tracing::{debug, info};

use crate::deposit::deposit_cells;
use crate::grid::Grid;

/// Guards the ray-cast division on horizontal edges.
const EDGE_EPS: f32 = 1e-9;

/// A user-drawn polygon that emits repellent once finished.
#[derive(Clone, Debug, Serialize)]
pub struct Mask {
    pub id: u32,
    pub name: String,
    pub points: Vec<[f32; 2]>,
    /// Linear indices of enclosed cells; `None` until the mask is finished.
    #[serde(skip)]
    pub cells: Option<Vec<u32>>,
    pub enabled: bool,
    pub strength: f32,
}

impl Mask {
    pub fn cell_count(&self) -> usize {
        self.cells.as_ref().map_or(0, Vec::len)
    }
}

/// What `toggle_draw` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawToggle {
    Started(u32),
    Finished(Option<u32>),
}

/// Finished masks plus at most one mask being drawn.
#[derive(Clone, Debug)]
pub struct MaskSet {
    masks: Vec<Mask>,
    drawing: Option<Mask>,
    counter: u32,
}

impl Default for MaskSet {
    fn default() -> Self {
        Self {
            masks: Vec::new(),
            drawing: None,
            counter: 1,
        }
    }
}

impl MaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing.is_some()
    }

    pub fn in_progress(&self) -> Option<&Mask> {
        self.drawing.as_ref()
    }

    pub fn masks(&self) -> &[Mask] {
        &self.masks
    }

    /// Begin a new mask, replacing any mask still being drawn.
    pub fn start(&mut self, strength: f32) -> u32 {
        let id = self.counter;
        self.counter += 1;
        self.drawing = Some(Mask {
            id,
            name: format!("Mask {id}"),
            points: Vec::new(),
            cells: None,
            enabled: true,
            strength,
        });
        debug!(id, "mask drawing started");
        id
    }

    /// Append a vertex to the mask being drawn. No-op when idle.
    pub fn add_point(&mut self, x: f32, y: f32) -> bool {
        match self.drawing.as_mut() {
            Some(m) => {
                m.points.push([x, y]);
                true
            }
            None => false,
        }
    }

    /// Track the strength control while a mask is being drawn.
    pub fn set_drawing_strength(&mut self, strength: f32) {
        if let Some(m) = self.drawing.as_mut() {
            m.strength = strength;
        }
    }

    /// Rasterize and register the mask being drawn.
    /// Fewer than 3 points discards it. Returns the registered id.
    pub fn finish(&mut self, w: usize, h: usize) -> Option<u32> {
        let mut m = self.drawing.take()?;
        if m.points.len() < 3 {
            debug!(id = m.id, points = m.points.len(), "mask discarded");
            return None;
        }
        let cells = rasterize(&m.points, w, h);
        info!(id = m.id, cells = cells.len(), "mask finished");
        m.cells = Some(cells);
        let id = m.id;
        self.masks.push(m);
        Some(id)
    }

    /// Drop the mask being drawn regardless of its point count.
    pub fn cancel(&mut self) -> bool {
        self.drawing.take().is_some()
    }

    /// Finish if drawing, otherwise start.
    pub fn toggle_draw(&mut self, strength: f32, w: usize, h: usize) -> DrawToggle {
        if self.is_drawing() {
            DrawToggle::Finished(self.finish(w, h))
        } else {
            DrawToggle::Started(self.start(strength))
        }
    }

    /// Flip a finished mask on/off. Returns the new state.
    pub fn toggle_enabled(&mut self, id: u32) -> Option<bool> {
        let m = self.masks.iter_mut().find(|m| m.id == id)?;
        m.enabled = !m.enabled;
        Some(m.enabled)
    }

    pub fn set_enabled(&mut self, id: u32, enabled: bool) -> bool {
        match self.masks.iter_mut().find(|m| m.id == id) {
            Some(m) => {
                m.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: u32) -> bool {
        let before = self.masks.len();
        self.masks.retain(|m| m.id != id);
        let removed = self.masks.len() != before;
        if removed {
            debug!(id, "mask deleted");
        }
        removed
    }

    /// Every enabled, finished mask adds its strength to its cells.
    pub fn deposit(&self, repel: &mut Grid<f32>) {
        for m in self.masks.iter().filter(|m| m.enabled) {
            if let Some(cells) = &m.cells {
                deposit_cells(repel, cells, m.strength);
            }
        }
    }
}

/// Ray-cast parity test. Degenerate polygons give a best-effort answer.
pub fn point_in_polygon(x: f32, y: f32, pts: &[[f32; 2]]) -> bool {
    let mut inside = false;
    let n = pts.len();
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let [xi, yi] = pts[i];
        let [xj, yj] = pts[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi + EDGE_EPS) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Linear indices of every cell whose center lies inside the polygon,
/// scanning only the polygon's bounding box clamped to the grid.
pub fn rasterize(pts: &[[f32; 2]], w: usize, h: usize) -> Vec<u32> {
    if pts.is_empty() || w == 0 || h == 0 {
        return Vec::new();
    }
    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for &[x, y] in pts {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    let clamp_x = |v: f32| (v.floor().max(0.0) as usize).min(w - 1);
    let clamp_y = |v: f32| (v.floor().max(0.0) as usize).min(h - 1);
    let (x0, x1) = (clamp_x(min_x), clamp_x(max_x));
    let (y0, y1) = (clamp_y(min_y), clamp_y(max_y));

    let mut cells = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            if point_in_polygon(x as f32 + 0.5, y as f32 + 0.5, pts) {
                cells.push((y * w + x) as u32);
            }
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: [[f32; 2]; 3] = [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]];

    #[test]
    fn triangle_rasterizes_cells_with_centers_inside() {
        let cells = rasterize(&TRIANGLE, 10, 10);
        assert!(cells.contains(&11)); // (1,1)
        assert!(cells.contains(&0)); // (0,0)
        assert!(!cells.contains(&33)); // (3,3)
        // Centers (x+0.5)+(y+0.5) < 4 => x+y <= 2
        assert_eq!(cells.len(), 6);
    }

    #[test]
    fn point_in_polygon_square() {
        let sq = [[1.0, 1.0], [5.0, 1.0], [5.0, 5.0], [1.0, 5.0]];
        assert!(point_in_polygon(3.0, 3.0, &sq));
        assert!(!point_in_polygon(6.0, 3.0, &sq));
        assert!(!point_in_polygon(3.0, 0.5, &sq));
    }

    #[test]
    fn collinear_polygon_is_empty_not_a_panic() {
        let line = [[0.0, 0.0], [2.0, 2.0], [4.0, 4.0]];
        assert!(rasterize(&line, 8, 8).is_empty());
    }

    #[test]
    fn finishing_with_two_points_discards() {
        let mut set = MaskSet::new();
        set.start(0.1);
        set.add_point(1.0, 1.0);
        set.add_point(5.0, 1.0);
        assert_eq!(set.finish(10, 10), None);
        assert!(set.masks().is_empty());
        assert!(!set.is_drawing());
    }

    #[test]
    fn finish_registers_and_ids_increment() {
        let mut set = MaskSet::new();
        let a = set.start(0.1);
        for p in TRIANGLE {
            set.add_point(p[0], p[1]);
        }
        assert_eq!(set.finish(10, 10), Some(a));
        let b = set.start(0.1);
        assert!(b > a);
        assert!(set.cancel());
        assert_eq!(set.masks().len(), 1);
        assert_eq!(set.masks()[0].name, format!("Mask {a}"));
        assert_eq!(set.masks()[0].cell_count(), 6);
    }

    #[test]
    fn add_point_when_idle_is_ignored() {
        let mut set = MaskSet::new();
        assert!(!set.add_point(1.0, 1.0));
        assert_eq!(set.finish(10, 10), None);
    }

    #[test]
    fn toggle_draw_starts_then_finishes() {
        let mut set = MaskSet::new();
        let DrawToggle::Started(id) = set.toggle_draw(0.2, 10, 10) else {
            panic!("expected start");
        };
        for p in TRIANGLE {
            set.add_point(p[0], p[1]);
        }
        assert_eq!(set.toggle_draw(0.2, 10, 10), DrawToggle::Finished(Some(id)));
    }

    #[test]
    fn disabled_and_in_progress_masks_do_not_deposit() {
        let mut set = MaskSet::new();
        let id = set.start(0.3);
        for p in TRIANGLE {
            set.add_point(p[0], p[1]);
        }
        set.finish(10, 10);
        set.start(0.3);
        for p in [[5.0, 5.0], [9.0, 5.0], [9.0, 9.0]] {
            set.add_point(p[0], p[1]);
        }

        let mut repel = Grid::<f32>::new(10, 10);
        set.deposit(&mut repel);
        assert!((repel.get(1, 1) - 0.3).abs() < 1e-6);
        assert_eq!(repel.get(8, 6), 0.0);

        assert_eq!(set.toggle_enabled(id), Some(false));
        let mut repel = Grid::<f32>::new(10, 10);
        set.deposit(&mut repel);
        assert!(repel.data.iter().all(|&v| v == 0.0));
        assert_eq!(set.masks().len(), 1);

        assert!(set.delete(id));
        assert!(!set.delete(id));
    }
}
