pub mod agents;
pub mod bake;
pub mod cities;
pub mod clock;
pub mod config;
pub mod deposit;
pub mod diffusion;
pub mod field;
pub mod grid;
pub mod mask;
pub mod metrics;
pub mod render;
pub mod rng;

use std::time::Instant;

use tracing::{debug, info};

use agents::{Agents, SenseWeights};
use bake::Brightness;
use cities::CityRegistry;
use config::Params;
use diffusion::diffuse_evaporate;
use field::{FieldKind, Fields};
use mask::{DrawToggle, MaskSet};
use metrics::{Metrics, compute_metrics};
use rng::Rng;

pub struct Timing {
    pub name: &'static str,
    pub ms: f64,
}

/// Which field a brush paints into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Brush {
    Food,
    Repel,
}

impl Brush {
    pub fn field(self) -> FieldKind {
        match self {
            Brush::Food => FieldKind::Food,
            Brush::Repel => FieldKind::Repel,
        }
    }
}

/// The whole model: fields, foragers, cities, masks and an optional baked
/// background. Every operation is a plain synchronous call; nothing runs
/// between calls.
pub struct Simulation {
    pub w: usize,
    pub h: usize,
    seed: u64,
    fields: Fields,
    agents: Agents,
    cities: CityRegistry,
    masks: MaskSet,
    background: Option<Brightness>,
    rng: Rng,
    step_index: usize,
    metrics: Metrics,
}

impl Simulation {
    /// Fresh model with no cities and no agents; the first tick seeds the
    /// population from its params.
    pub fn new(w: usize, h: usize, seed: u64) -> Self {
        assert!(w >= 3 && h >= 3, "grid must be at least 3x3, got {w}x{h}");
        Self {
            w,
            h,
            seed,
            fields: Fields::new(w, h),
            agents: Agents::new(),
            cities: CityRegistry::new(),
            masks: MaskSet::new(),
            background: None,
            rng: Rng::new(seed),
            step_index: 0,
            metrics: Metrics::default(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn agents(&self) -> &Agents {
        &self.agents
    }

    pub fn cities(&self) -> &CityRegistry {
        &self.cities
    }

    pub fn masks(&self) -> &MaskSet {
        &self.masks
    }

    /// Metrics from the most recent tick.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Recompute metrics for the current trail at another threshold
    /// without advancing the model.
    pub fn metrics_at(&self, threshold: f32) -> Metrics {
        compute_metrics(&self.fields.trail.current, self.cities.as_slice(), threshold)
    }

    // ----------------------------------------------------------------------
    // Lifecycle

    /// Clear all fields, restart the RNG from the seed and reseed `agents`
    /// foragers around the current cities. Cities and masks are kept.
    pub fn reset(&mut self, agents: usize) {
        self.fields.clear();
        self.rng = Rng::new(self.seed);
        self.step_index = 0;
        self.metrics = Metrics::default();
        self.agents
            .seed(agents, self.cities.as_slice(), self.w, self.h, &mut self.rng);
        info!(seed = self.seed, agents, cities = self.cities.len(), "simulation reset");
    }

    /// Rebuild the population at a new size.
    pub fn set_population(&mut self, count: usize) {
        self.agents
            .seed(count, self.cities.as_slice(), self.w, self.h, &mut self.rng);
    }

    /// Replace the population with explicit agents.
    pub fn set_agents(&mut self, agents: Agents) {
        self.agents = agents;
    }

    // ----------------------------------------------------------------------
    // Tick

    /// Advance the model by one step:
    /// cities feed → masks emit → background bakes → agents → diffusion →
    /// swap → metrics. User painting happens between ticks via `paint`.
    pub fn tick(&mut self, params: &Params) -> Vec<Timing> {
        let mut timings = Vec::new();

        if self.agents.len() != params.agents {
            debug!(from = self.agents.len(), to = params.agents, "population resized");
            self.set_population(params.agents);
        }

        // 1. Sources
        let t = Instant::now();
        self.cities.feed(&mut self.fields.food.current);
        self.masks.set_drawing_strength(params.mask_strength);
        self.masks.deposit(&mut self.fields.repel.current);
        if params.bake_enabled {
            if let Some(bg) = &self.background {
                bg.bake(
                    &mut self.fields.repel.current,
                    params.bake_strength,
                    params.bake_threshold,
                    params.bake_invert,
                );
            }
        }
        timings.push(Timing {
            name: "sources",
            ms: t.elapsed().as_secs_f64() * 1000.0,
        });

        // 2. Agents (sequential; food is first come first served)
        let t = Instant::now();
        let weights = SenseWeights {
            food: params.w_food,
            repel: params.w_repel,
        };
        self.agents.update(&mut self.fields, weights, &mut self.rng);
        timings.push(Timing {
            name: "agents",
            ms: t.elapsed().as_secs_f64() * 1000.0,
        });

        // 3. Diffuse each field into its shadow buffer, then swap
        let t = Instant::now();
        let Fields { trail, food, repel } = &mut self.fields;
        rayon::join(
            || {
                let (src, dst) = trail.split();
                diffuse_evaporate(src, dst, params.diffusion, params.evaporation);
            },
            || {
                rayon::join(
                    || {
                        let (src, dst) = food.split();
                        diffuse_evaporate(src, dst, params.food_diffusion(), params.food_evaporation);
                    },
                    || {
                        let (src, dst) = repel.split();
                        diffuse_evaporate(src, dst, params.repel_diffusion(), params.repel_evaporation);
                    },
                )
            },
        );
        self.fields.swap_all();
        timings.push(Timing {
            name: "diffusion",
            ms: t.elapsed().as_secs_f64() * 1000.0,
        });

        // 4. Metrics
        let t = Instant::now();
        self.metrics = compute_metrics(
            &self.fields.trail.current,
            self.cities.as_slice(),
            params.tube_threshold,
        );
        timings.push(Timing {
            name: "metrics",
            ms: t.elapsed().as_secs_f64() * 1000.0,
        });

        self.step_index += 1;
        timings
    }

    // ----------------------------------------------------------------------
    // External deposits

    /// Saturating circular deposit into any field.
    pub fn deposit(&mut self, kind: FieldKind, x: f32, y: f32, radius: f32, amount: f32) {
        deposit::deposit_circle(self.fields.get_mut(kind), x, y, radius, amount);
    }

    /// One brush application with the current params.
    pub fn paint(&mut self, brush: Brush, x: f32, y: f32, params: &Params) {
        self.deposit(brush.field(), x, y, params.brush_radius, params.paint_amount());
    }

    pub fn set_background(&mut self, brightness: Brightness) {
        info!(w = brightness.grid.w, h = brightness.grid.h, "background set");
        self.background = Some(brightness);
    }

    pub fn clear_background(&mut self) {
        self.background = None;
    }

    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    // ----------------------------------------------------------------------
    // Cities

    pub fn add_city(&mut self, x: f32, y: f32) {
        self.cities.add(x, y);
    }

    pub fn remove_city(&mut self, x: f32, y: f32) -> bool {
        self.cities.remove_near(x, y)
    }

    pub fn clear_cities(&mut self) {
        self.cities.clear();
    }

    /// Add `count` randomly placed cities from the model's RNG.
    pub fn scatter_cities(&mut self, count: usize) {
        self.cities.scatter(count, self.w, self.h, &mut self.rng);
    }

    // ----------------------------------------------------------------------
    // Masks

    pub fn start_mask(&mut self, strength: f32) -> u32 {
        self.masks.start(strength)
    }

    pub fn add_mask_point(&mut self, x: f32, y: f32) -> bool {
        self.masks.add_point(x, y)
    }

    pub fn finish_mask(&mut self) -> Option<u32> {
        self.masks.finish(self.w, self.h)
    }

    pub fn cancel_mask(&mut self) -> bool {
        self.masks.cancel()
    }

    pub fn toggle_mask_draw(&mut self, strength: f32) -> DrawToggle {
        self.masks.toggle_draw(strength, self.w, self.h)
    }

    pub fn toggle_mask_enabled(&mut self, id: u32) -> Option<bool> {
        self.masks.toggle_enabled(id)
    }

    pub fn set_mask_enabled(&mut self, id: u32, enabled: bool) -> bool {
        self.masks.set_enabled(id, enabled)
    }

    pub fn delete_mask(&mut self, id: u32) -> bool {
        self.masks.delete(id)
    }

    // ----------------------------------------------------------------------
    // Snapshots

    /// Composite RGBA snapshot with mask tint and city markers.
    pub fn render(&self, threshold: f32) -> Vec<u8> {
        let mut rgba = render::render_fields(
            &self.fields.trail.current,
            &self.fields.food.current,
            &self.fields.repel.current,
            threshold,
        );
        render::overlay_masks(&mut rgba, self.masks.masks());
        render::overlay_cities(&mut rgba, self.w, self.h, self.cities.as_slice());
        rgba
    }
}
