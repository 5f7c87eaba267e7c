use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Population cap accepted by `Params::validate`.
pub const MAX_AGENTS: usize = 200_000;

/// All tunable parameters, exposed as UI sliders in the frontend.
/// One snapshot is handed to every tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    // Trail field
    pub diffusion: f32,
    pub evaporation: f32,

    // Food / repellent fields, relative to the trail diffusion
    pub food_diffusion_scale: f32,
    pub food_evaporation: f32,
    pub repel_diffusion_scale: f32,
    pub repel_evaporation: f32,

    // Sensing
    pub w_food: f32,
    pub w_repel: f32,

    // Painting
    pub deposit: f32,
    pub brush_radius: f32,

    // Population and analysis
    pub agents: usize,
    pub tube_threshold: f32,

    // Masks
    pub mask_strength: f32,

    // Background baking
    pub bake_enabled: bool,
    pub bake_strength: f32,
    pub bake_threshold: f32,
    pub bake_invert: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            diffusion: 0.25,
            evaporation: 0.97,
            food_diffusion_scale: 0.7,
            food_evaporation: 0.995,
            repel_diffusion_scale: 0.9,
            repel_evaporation: 0.995,
            w_food: 1.5,
            w_repel: 2.0,
            deposit: 3.0,
            brush_radius: 6.0,
            agents: 4000,
            tube_threshold: 0.25,
            mask_strength: 0.05,
            bake_enabled: false,
            bake_strength: 0.03,
            bake_threshold: 0.6,
            bake_invert: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be finite")]
    NotFinite { name: &'static str },
    #[error("{name} = {value} is outside {range}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        range: &'static str,
    },
    #[error("agents = {0} exceeds supported maximum ({max})", max = MAX_AGENTS)]
    TooManyAgents(usize),
    #[error("failed to read params: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse params: {0}")]
    Json(#[from] serde_json::Error),
}

impl Params {
    /// Paint amount per brush application.
    pub fn paint_amount(&self) -> f32 {
        self.deposit * 0.08
    }

    pub fn food_diffusion(&self) -> f32 {
        self.diffusion * self.food_diffusion_scale
    }

    pub fn repel_diffusion(&self) -> f32 {
        self.diffusion * self.repel_diffusion_scale
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let params: Params = serde_json::from_str(s)?;
        params.validate()?;
        Ok(params)
    }

    /// Load a (possibly partial) JSON params file on top of the defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = [
            ("diffusion", self.diffusion),
            ("food_diffusion", self.food_diffusion()),
            ("repel_diffusion", self.repel_diffusion()),
        ];
        let retention = [
            ("evaporation", self.evaporation),
            ("food_evaporation", self.food_evaporation),
            ("repel_evaporation", self.repel_evaporation),
        ];
        let non_negative = [
            ("food_diffusion_scale", self.food_diffusion_scale),
            ("repel_diffusion_scale", self.repel_diffusion_scale),
            ("w_food", self.w_food),
            ("w_repel", self.w_repel),
            ("deposit", self.deposit),
            ("brush_radius", self.brush_radius),
            ("tube_threshold", self.tube_threshold),
            ("mask_strength", self.mask_strength),
            ("bake_strength", self.bake_strength),
            ("bake_threshold", self.bake_threshold),
        ];

        for &(name, value) in unit.iter().chain(&retention).chain(&non_negative) {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { name });
            }
        }
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value, range: "[0, 1]" });
            }
        }
        for (name, value) in retention {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::OutOfRange { name, value, range: "(0, 1]" });
            }
        }
        for (name, value) in non_negative {
            if value < 0.0 {
                return Err(ConfigError::OutOfRange { name, value, range: "[0, inf)" });
            }
        }
        if self.agents > MAX_AGENTS {
            return Err(ConfigError::TooManyAgents(self.agents));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_keep_retention_order() {
        let p = Params::default();
        p.validate().unwrap();
        assert!(p.evaporation < p.food_evaporation);
        assert!(p.food_evaporation <= p.repel_evaporation);
        assert!(p.food_diffusion() < p.diffusion);
        assert!(p.repel_diffusion() < p.diffusion);
    }

    #[test]
    fn partial_json_overrides_defaults() {
        let p = Params::from_json_str(r#"{ "diffusion": 0.5, "agents": 10 }"#).unwrap();
        assert_eq!(p.diffusion, 0.5);
        assert_eq!(p.agents, 10);
        assert_eq!(p.w_food, Params::default().w_food);
    }

    #[test]
    fn rejects_bad_values() {
        let p = Params { evaporation: 0.0, ..Params::default() };
        assert!(matches!(p.validate(), Err(ConfigError::OutOfRange { name: "evaporation", .. })));

        let p = Params { diffusion: f32::NAN, ..Params::default() };
        assert!(matches!(p.validate(), Err(ConfigError::NotFinite { .. })));

        let p = Params { agents: MAX_AGENTS + 1, ..Params::default() };
        assert!(matches!(p.validate(), Err(ConfigError::TooManyAgents(_))));

        let p = Params { diffusion: 1.0, repel_diffusion_scale: 1.5, ..Params::default() };
        assert!(p.validate().is_err());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(Params::from_json_str("{ nope"), Err(ConfigError::Json(_))));
    }
}
