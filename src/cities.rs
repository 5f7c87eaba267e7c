use serde::{Deserialize, Serialize};

use crate::deposit::deposit_circle;
use crate::grid::Grid;
use crate::rng::Rng;

/// Query radius for removing a city near a point.
pub const REMOVE_RADIUS: f32 = 20.0;
/// Food radius each city feeds per tick.
pub const FEED_RADIUS: f32 = 5.0;
/// Food amount each city feeds per tick.
pub const FEED_STRENGTH: f32 = 0.045;
/// Keep-out margin for randomly scattered cities.
const SCATTER_PAD: f32 = 14.0;

/// Anchor point the network should connect.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub x: f32,
    pub y: f32,
}

/// Ordered collection of cities (append order).
#[derive(Clone, Debug, Default)]
pub struct CityRegistry {
    cities: Vec<City>,
}

impl CityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, x: f32, y: f32) {
        self.cities.push(City { x, y });
    }

    /// Remove the city nearest to `(x, y)`, if it lies within `REMOVE_RADIUS`.
    /// Returns whether one was removed.
    pub fn remove_near(&mut self, x: f32, y: f32) -> bool {
        let r2 = REMOVE_RADIUS * REMOVE_RADIUS;
        let hit = self
            .cities
            .iter()
            .enumerate()
            .map(|(i, c)| (i, (c.x - x).powi(2) + (c.y - y).powi(2)))
            .filter(|&(_, d2)| d2 <= r2)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);
        match hit {
            Some(i) => {
                self.cities.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.cities.clear();
    }

    pub fn as_slice(&self) -> &[City] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Every city deposits food around itself.
    pub fn feed(&self, food: &mut Grid<f32>) {
        for c in &self.cities {
            deposit_circle(food, c.x, c.y, FEED_RADIUS, FEED_STRENGTH);
        }
    }

    /// Append `count` cities at random positions away from the border.
    pub fn scatter(&mut self, count: usize, w: usize, h: usize, rng: &mut Rng) {
        let pad = SCATTER_PAD.min(w as f32 / 2.0).min(h as f32 / 2.0);
        for _ in 0..count {
            let x = rng.range_f32(pad, w as f32 - pad);
            let y = rng.range_f32(pad, h as f32 - pad);
            self.add(x, y);
        }
    }
}
