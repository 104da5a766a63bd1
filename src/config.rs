//! `timbremap.toml` configuration.
//!
//! ```toml
//! [load]
//! scale = "normal"
//! prefer_binary = true
//!
//! [validation]
//! steps = 10
//! low = 0.01
//! high = 0.99
//!
//! [export]
//! precision = 32
//! write_binary = true
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use timbremap_core::validate::{DEFAULT_GRID_HIGH, DEFAULT_GRID_LOW, DEFAULT_GRID_STEPS};
use timbremap_core::{RoundTripValidator, ScaleMode};
use timbremap_export::{ExportOptions, LoadOptions};

/// File name looked up next to an export directory.
pub const CONFIG_FILE: &str = "timbremap.toml";

/// Control grid used by the round-trip check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub steps: usize,
    pub low: f64,
    pub high: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_GRID_STEPS,
            low: DEFAULT_GRID_LOW,
            high: DEFAULT_GRID_HIGH,
        }
    }
}

impl From<ValidationConfig> for RoundTripValidator {
    fn from(c: ValidationConfig) -> Self {
        RoundTripValidator::new(c.steps, c.low, c.high)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimbreMapConfig {
    pub load: LoadOptions,
    pub validation: ValidationConfig,
    pub export: ExportOptions,
}

impl TimbreMapConfig {
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// `timbremap.toml` inside `dir`, if there is one.
    pub fn sidecar(dir: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = dir.as_ref().join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        Self::from_file(path).map(Some)
    }

    pub fn validate(&self) -> Result<()> {
        let v = &self.validation;
        if v.steps == 0 {
            return Err(Error::InvalidConfig("validation.steps must be > 0".into()));
        }
        if !(v.low.is_finite() && v.high.is_finite()) || v.low > v.high {
            return Err(Error::InvalidConfig(format!(
                "validation range [{}, {}] is invalid",
                v.low, v.high
            )));
        }
        if self.load.scale == ScaleMode::Normal && !(v.low > 0.0 && v.high < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "normal scale needs a grid inside (0, 1), got [{}, {}]",
                v.low, v.high
            )));
        }
        self.export.validate()?;
        Ok(())
    }
}
