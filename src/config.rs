//! Interaction configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_CARRIER_THICKNESS, DEFAULT_DUPLICATE_OFFSET, DEFAULT_GRID_PITCH,
    DEFAULT_HEADING_PITCH_DEG,
};

pub const GRID_PITCH_VAR: &str = "FLOORPLAN_GRID_PITCH";
pub const HEADING_PITCH_VAR: &str = "FLOORPLAN_HEADING_PITCH_DEG";
pub const SNAP_TO_GRID_VAR: &str = "FLOORPLAN_SNAP_TO_GRID";
pub const CARRIER_THICKNESS_VAR: &str = "FLOORPLAN_CARRIER_THICKNESS";
pub const DUPLICATE_OFFSET_VAR: &str = "FLOORPLAN_DUPLICATE_OFFSET";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("{var} must be greater than zero, got {value}")]
    NonPositive { var: &'static str, value: String },
}

/// Tunables for snapping and attachment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Grid pitch for position snapping, in floor units.
    pub grid_pitch: f64,
    /// Angular pitch for rotate gestures, in degrees.
    pub heading_pitch_deg: f64,
    /// Whether drag gestures snap positions to the grid.
    pub snap_to_grid: bool,
    /// Mounting-surface height of a travel carrier above its base.
    pub carrier_thickness: f64,
    /// Floor offset applied to both axes of a duplicated entity.
    pub duplicate_offset: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            grid_pitch: DEFAULT_GRID_PITCH,
            heading_pitch_deg: DEFAULT_HEADING_PITCH_DEG,
            snap_to_grid: true,
            carrier_thickness: DEFAULT_CARRIER_THICKNESS,
            duplicate_offset: DEFAULT_DUPLICATE_OFFSET,
        }
    }
}

impl InteractionConfig {
    /// Build config from environment variables.
    ///
    /// All optional:
    /// - `FLOORPLAN_GRID_PITCH`: default 0.5, must be > 0
    /// - `FLOORPLAN_HEADING_PITCH_DEG`: default 15, must be > 0
    /// - `FLOORPLAN_SNAP_TO_GRID`: `true`/`false`/`1`/`0`, default true
    /// - `FLOORPLAN_CARRIER_THICKNESS`: default 0.2
    /// - `FLOORPLAN_DUPLICATE_OFFSET`: default 0.5
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set but malformed, or when a
    /// pitch is not strictly positive.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Unset or non-unicode variables fall back to the default.
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`InteractionConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let float = |var: &'static str, default| parse_f64(var, lookup(var), default);
        let grid_pitch = float(GRID_PITCH_VAR, defaults.grid_pitch)?;
        let heading_pitch_deg = float(HEADING_PITCH_VAR, defaults.heading_pitch_deg)?;
        let snap_to_grid =
            parse_bool(SNAP_TO_GRID_VAR, lookup(SNAP_TO_GRID_VAR), defaults.snap_to_grid)?;
        let carrier_thickness = float(CARRIER_THICKNESS_VAR, defaults.carrier_thickness)?;
        let duplicate_offset = float(DUPLICATE_OFFSET_VAR, defaults.duplicate_offset)?;

        require_positive(GRID_PITCH_VAR, grid_pitch)?;
        require_positive(HEADING_PITCH_VAR, heading_pitch_deg)?;

        Ok(Self {
            grid_pitch,
            heading_pitch_deg,
            snap_to_grid,
            carrier_thickness,
            duplicate_offset,
        })
    }
}

fn parse_f64(var: &'static str, raw: Option<String>, default: f64) -> Result<f64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ConfigError::Invalid { var, value: raw }),
    }
}

fn parse_bool(var: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { var, value: raw }),
    }
}

fn require_positive(var: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { var, value: value.to_string() })
    }
}
