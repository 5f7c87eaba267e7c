use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// The three scalar fields of the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Trail,
    Food,
    Repel,
}

impl FieldKind {
    pub const ALL: [FieldKind; 3] = [FieldKind::Trail, FieldKind::Food, FieldKind::Repel];
}

/// A field plus the shadow buffer the diffusion step writes into.
/// `swap` exchanges the roles; nothing is copied.
#[derive(Clone, Debug)]
pub struct DoubleBuffer {
    pub current: Grid<f32>,
    pub next: Grid<f32>,
}

impl DoubleBuffer {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            current: Grid::new(w, h),
            next: Grid::new(w, h),
        }
    }

    #[inline]
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    pub fn clear(&mut self) {
        self.current.fill_default();
        self.next.fill_default();
    }

    /// Borrow the source and destination buffers at once.
    #[inline]
    pub fn split(&mut self) -> (&Grid<f32>, &mut Grid<f32>) {
        (&self.current, &mut self.next)
    }
}

/// Trail, food and repellent, each double-buffered.
#[derive(Clone, Debug)]
pub struct Fields {
    pub trail: DoubleBuffer,
    pub food: DoubleBuffer,
    pub repel: DoubleBuffer,
}

impl Fields {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            trail: DoubleBuffer::new(w, h),
            food: DoubleBuffer::new(w, h),
            repel: DoubleBuffer::new(w, h),
        }
    }

    pub fn buffer(&self, kind: FieldKind) -> &DoubleBuffer {
        match kind {
            FieldKind::Trail => &self.trail,
            FieldKind::Food => &self.food,
            FieldKind::Repel => &self.repel,
        }
    }

    pub fn buffer_mut(&mut self, kind: FieldKind) -> &mut DoubleBuffer {
        match kind {
            FieldKind::Trail => &mut self.trail,
            FieldKind::Food => &mut self.food,
            FieldKind::Repel => &mut self.repel,
        }
    }

    /// Current (readable) buffer of a field.
    #[inline]
    pub fn get(&self, kind: FieldKind) -> &Grid<f32> {
        &self.buffer(kind).current
    }

    #[inline]
    pub fn get_mut(&mut self, kind: FieldKind) -> &mut Grid<f32> {
        &mut self.buffer_mut(kind).current
    }

    pub fn clear(&mut self) {
        self.trail.clear();
        self.food.clear();
        self.repel.clear();
    }

    pub fn swap_all(&mut self) {
        self.trail.swap();
        self.food.swap();
        self.repel.swap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_exchanges_roles_without_copying() {
        let mut buf = DoubleBuffer::new(4, 4);
        buf.current.data[5] = 1.0;
        buf.next.data[5] = 0.25;
        let cur_ptr = buf.current.data.as_ptr();
        buf.swap();
        assert_eq!(buf.current.data[5], 0.25);
        assert_eq!(buf.next.data[5], 1.0);
        assert_eq!(buf.next.data.as_ptr(), cur_ptr);
    }

    #[test]
    fn clear_zeroes_both_buffers() {
        let mut fields = Fields::new(3, 3);
        for kind in FieldKind::ALL {
            fields.buffer_mut(kind).current.data.fill(0.5);
            fields.buffer_mut(kind).next.data.fill(0.5);
        }
        fields.clear();
        for kind in FieldKind::ALL {
            assert!(fields.buffer(kind).current.data.iter().all(|&v| v == 0.0));
            assert!(fields.buffer(kind).next.data.iter().all(|&v| v == 0.0));
        }
    }
}
