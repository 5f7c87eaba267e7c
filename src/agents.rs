use tracing::debug;

use crate::cities::City;
use crate::deposit::{add_saturating, sample};
use crate::field::Fields;
use crate::grid::{Grid, interior};
use crate::rng::Rng;

pub const STEP: f32 = 1.0;
pub const SENSOR_DIST: f32 = 5.0;
pub const SENSOR_ANGLE: f32 = 0.45;
pub const TURN_ANGLE: f32 = 0.30;
pub const RANDOM_STEER: f32 = 0.08;
pub const TRAIL_DEPOSIT: f32 = 0.045;
pub const FOOD_CONSUMPTION: f32 = 0.20;
/// Share of eaten food turned into extra trail.
pub const FOOD_TO_TRAIL: f32 = 0.8;
/// Food at or below this is ignored.
const FOOD_EPS: f32 = 0.001;

/// Ring around a city where new agents are placed.
const SEED_RING_MIN: f32 = 8.0;
const SEED_RING_SPAN: f32 = 12.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Agent {
    pub x: f32,
    pub y: f32,
    /// Radians.
    pub heading: f32,
}

/// Steering decision from the three sensor readings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Steer {
    Left,
    Right,
    Wander,
}

/// Per-tick sensing weights.
#[derive(Clone, Copy, Debug)]
pub struct SenseWeights {
    pub food: f32,
    pub repel: f32,
}

/// Turn only toward a strictly dominant side sensor. Any tie, or a leading
/// forward sensor, falls through to a random wobble.
#[inline]
pub fn steer(forward: f32, left: f32, right: f32) -> Steer {
    if left > forward && left > right {
        Steer::Left
    } else if right > forward && right > left {
        Steer::Right
    } else {
        Steer::Wander
    }
}

/// Toroidal wrap on one axis of the interior `[lo, hi]`: leaving one side
/// re-enters at the opposite edge.
#[inline]
pub fn wrap_axis(v: f32, lo: f32, hi: f32) -> f32 {
    if v < lo {
        hi
    } else if v > hi {
        lo
    } else {
        v
    }
}

impl Agent {
    /// Move one step along the heading and wrap into the interior.
    pub fn advance(&mut self, w: usize, h: usize) {
        let (bx, by) = interior(w, h);
        self.x = wrap_axis(self.x + self.heading.cos() * STEP, bx[0], bx[1]);
        self.y = wrap_axis(self.y + self.heading.sin() * STEP, by[0], by[1]);
    }

    /// Cell the agent currently occupies.
    #[inline]
    pub fn cell(&self, w: usize) -> usize {
        self.y as usize * w + self.x as usize
    }
}

/// Combined attractiveness at one sensor point.
#[inline]
fn sense(fields: &Fields, x: f32, y: f32, weights: SenseWeights) -> f32 {
    sample(&fields.trail.current, x, y) + weights.food * sample(&fields.food.current, x, y)
        - weights.repel * sample(&fields.repel.current, x, y)
}

/// The forager population.
#[derive(Clone, Debug, Default)]
pub struct Agents {
    agents: Vec<Agent>,
}

impl Agents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    pub fn as_slice(&self) -> &[Agent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Rebuild the population with `count` fresh agents.
    /// With cities present, agents start on a ring around `cities[i % n]`;
    /// otherwise anywhere on the grid.
    pub fn seed(&mut self, count: usize, cities: &[City], w: usize, h: usize, rng: &mut Rng) {
        let (bx, by) = interior(w, h);
        let mut agents = Vec::with_capacity(count);
        for i in 0..count {
            let (x, y) = if cities.is_empty() {
                // Keep free agents inside the interior so the first move is a
                // regular step, not a wrap.
                (rng.range_f32(bx[0], bx[1]), rng.range_f32(by[0], by[1]))
            } else {
                let c = cities[i % cities.len()];
                let r = SEED_RING_MIN + rng.next_f32() * SEED_RING_SPAN;
                let t = rng.angle();
                (
                    (c.x + t.cos() * r).clamp(bx[0], bx[1]),
                    (c.y + t.sin() * r).clamp(by[0], by[1]),
                )
            };
            agents.push(Agent {
                x,
                y,
                heading: rng.angle(),
            });
        }
        debug!(count, cities = cities.len(), "agents seeded");
        self.agents = agents;
    }

    /// Sense, steer, move, deposit and eat, in iteration order.
    ///
    /// Trail and food are written in place, so an agent sees the deposits and
    /// consumption of the agents before it in the same tick.
    pub fn update(&mut self, fields: &mut Fields, weights: SenseWeights, rng: &mut Rng) {
        let w = fields.trail.current.w;
        let h = fields.trail.current.h;
        for agent in &mut self.agents {
            let (x, y, a) = (agent.x, agent.y, agent.heading);
            let sense_at = |angle: f32| {
                let sx = x + angle.cos() * SENSOR_DIST;
                let sy = y + angle.sin() * SENSOR_DIST;
                sense(fields, sx, sy, weights)
            };
            let forward = sense_at(a);
            let left = sense_at(a - SENSOR_ANGLE);
            let right = sense_at(a + SENSOR_ANGLE);

            agent.heading = match steer(forward, left, right) {
                Steer::Left => a - TURN_ANGLE,
                Steer::Right => a + TURN_ANGLE,
                Steer::Wander => a + rng.jitter(RANDOM_STEER),
            };
            agent.advance(w, h);

            let i = agent.cell(w);
            deposit_and_eat(&mut fields.trail.current, &mut fields.food.current, i);
        }
    }
}

/// Lay trail at cell `i`, then eat up to `FOOD_CONSUMPTION` of the food there.
fn deposit_and_eat(trail: &mut Grid<f32>, food: &mut Grid<f32>, i: usize) {
    add_saturating(trail, i, TRAIL_DEPOSIT);
    let f = food.data[i];
    if f > FOOD_EPS {
        let eat = FOOD_CONSUMPTION.min(f);
        food.data[i] = f - eat;
        add_saturating(trail, i, eat * FOOD_TO_TRAIL);
    }
}
