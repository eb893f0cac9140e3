use bevy::prelude::*;
use constants::tracking::{CROSSHAIR, DEFAULT_TICK_HZ};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::format::UnitSystem;
use super::smoothing::SmoothingStrategy;

/// Where the in-progress line ends while the second point is being aimed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAnchor {
    /// At the projected smoothed surface point under the crosshair.
    #[default]
    Surface,
    /// At the fixed crosshair coordinate.
    ScreenCenter,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Runtime configuration of the measurement engine.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureSettings {
    pub unit_system: UnitSystem,
    pub smoothing: SmoothingStrategy,
    pub pending_anchor: PendingAnchor,
    /// Frame projection rate when running on the fixed timestep.
    pub tick_hz: f64,
    /// Normalised viewport coordinate used for hit-testing and capture.
    pub crosshair: Vec2,
}

impl Default for MeasureSettings {
    fn default() -> Self {
        Self {
            unit_system: UnitSystem::default(),
            smoothing: SmoothingStrategy::default(),
            pending_anchor: PendingAnchor::default(),
            tick_hz: DEFAULT_TICK_HZ,
            crosshair: CROSSHAIR,
        }
    }
}

impl MeasureSettings {
    /// Parse and validate settings. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        match self.smoothing {
            SmoothingStrategy::Exponential { factor } if !(factor > 0.0 && factor <= 1.0) => {
                return Err(SettingsError::Invalid(format!(
                    "smoothing factor must be in (0, 1], got {factor}"
                )));
            }
            SmoothingStrategy::RollingAverage { window: 0 } => {
                return Err(SettingsError::Invalid(
                    "rolling average window must hold at least one sample".to_string(),
                ));
            }
            _ => {}
        }

        if !(self.tick_hz.is_finite() && self.tick_hz > 0.0) {
            return Err(SettingsError::Invalid(format!(
                "tick rate must be positive, got {}",
                self.tick_hz
            )));
        }

        let in_viewport = |v: f32| (0.0..=1.0).contains(&v);
        if !(in_viewport(self.crosshair.x) && in_viewport(self.crosshair.y)) {
            return Err(SettingsError::Invalid(format!(
                "crosshair must lie in the unit viewport, got {}",
                self.crosshair
            )));
        }

        Ok(())
    }
}
