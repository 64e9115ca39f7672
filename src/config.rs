use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{animator::motion::WrapMode, error::Result};

/// Authoring defaults shared by graphs, controllers and the system registry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    /// seconds, used by newly created transitions
    pub default_transition_cost: f32,
    /// seconds, used by `AnimationGraph::linear_switch_default`
    pub default_linear_switch_cost: f32,
    /// seconds, used by `AnimationController::play_default`
    pub default_cross_fade: f32,
    pub default_speed: f32,
    pub default_wrap_mode: WrapMode,
    /// initial number of controller slots in an `AnimationSystem`
    pub system_capacity: usize,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            default_transition_cost: 0.3,
            default_linear_switch_cost: 0.5,
            default_cross_fade: 0.3,
            default_speed: 1.0,
            default_wrap_mode: WrapMode::Loop,
            system_capacity: 200,
        }
    }
}

impl AnimationConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}
