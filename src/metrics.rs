use serde::{Deserialize, Serialize};

use crate::cities::City;
use crate::grid::{Grid, clamp_cell, neighbors8};

/// Component label for a cell at or below threshold.
const BELOW: i32 = -2;
/// Component label for a cell not visited yet.
const UNSEEN: i32 = -1;

/// Network connectivity snapshot for one tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Cells whose trail exceeds the tube threshold.
    pub active: usize,
    /// 8-connected tube components.
    pub components: usize,
    /// Component of each city's cell, in city order.
    pub city_components: Vec<Option<u32>>,
    pub connected_count: usize,
    /// At least one city, all connected, all in one component.
    pub all_connected: bool,
}

/// Label 8-connected components of cells with `trail > threshold`.
/// Returns per-cell labels (`>= 0` component id, negative otherwise) and the
/// component count. Iterative flood fill; every cell is labeled once.
pub fn label_components(trail: &Grid<f32>, threshold: f32) -> (Vec<i32>, usize) {
    let w = trail.w;
    let h = trail.h;
    let n = w * h;
    let mut comp = vec![UNSEEN; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_id = 0i32;

    for i in 0..n {
        if comp[i] != UNSEEN {
            continue;
        }
        if trail.data[i] <= threshold {
            comp[i] = BELOW;
            continue;
        }

        comp[i] = next_id;
        stack.push(i);
        while let Some(p) = stack.pop() {
            for (nx, ny) in neighbors8(p % w, p / w, w, h) {
                let q = ny * w + nx;
                if comp[q] == UNSEEN && trail.data[q] > threshold {
                    comp[q] = next_id;
                    stack.push(q);
                }
            }
        }
        next_id += 1;
    }

    (comp, next_id as usize)
}

/// Rebuild connectivity from scratch for the current trail field.
pub fn compute_metrics(trail: &Grid<f32>, cities: &[City], threshold: f32) -> Metrics {
    let (comp, components) = label_components(trail, threshold);
    let active = trail.data.iter().filter(|&&v| v > threshold).count();

    let city_components: Vec<Option<u32>> = cities
        .iter()
        .map(|c| {
            let (x, y) = clamp_cell(c.x.floor(), c.y.floor(), trail.w, trail.h);
            let id = comp[y * trail.w + x];
            (id >= 0).then_some(id as u32)
        })
        .collect();

    let connected_count = city_components.iter().filter(|c| c.is_some()).count();
    let first = city_components.first().copied().flatten();
    let all_connected = first.is_some() && city_components.iter().all(|&c| c == first);

    Metrics {
        active,
        components,
        city_components,
        connected_count,
        all_connected,
    }
}
