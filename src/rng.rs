//! Deterministic RNG based on splitmix64. Same seed, same run.

const GOLDEN: u64 = 0x9E3779B97F4A7C15;

#[inline]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(GOLDEN);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Sequential RNG for agent seeding and steering jitter.
#[derive(Clone, Debug)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        let out = splitmix64(self.state);
        self.state = self.state.wrapping_add(GOLDEN);
        out
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        ((self.next_u64() >> 40) as u32) as f32 / 16777216.0
    }

    pub fn range_f32(&mut self, lo: f32, hi: f32) -> f32 {
        lo + self.next_f32() * (hi - lo)
    }

    /// Uniform heading in `[0, 2pi)`.
    pub fn angle(&mut self) -> f32 {
        self.next_f32() * std::f32::consts::TAU
    }

    /// Uniform in `[-spread/2, spread/2)`.
    pub fn jitter(&mut self, spread: f32) -> f32 {
        (self.next_f32() - 0.5) * spread
    }
}
