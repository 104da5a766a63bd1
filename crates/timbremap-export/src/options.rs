//! Export and load options.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use timbremap_core::ScaleMode;

/// Fractional digits written per value. The host runtime parses these with
/// `strtod`, so anything beyond `f64` precision is padding.
pub const DEFAULT_PRECISION: usize = 32;

/// Export options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Fractional digits per text value.
    pub precision: usize,
    /// Write a `.npy` sibling next to every text matrix.
    pub write_binary: bool,
    /// Write `manifest.toml` at the export root.
    pub write_manifest: bool,
    /// Run the round-trip validator after a whole-model export.
    pub validate: bool,
    /// Scale mode the validator uses.
    pub scale: ScaleMode,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            write_binary: cfg!(feature = "npy"),
            write_manifest: true,
            validate: true,
            scale: ScaleMode::Uniform,
        }
    }
}

impl ExportOptions {
    pub fn validate(&self) -> Result<()> {
        if self.precision == 0 || self.precision > 64 {
            return Err(StoreError::InvalidOptions(format!(
                "precision {} out of range (1-64)",
                self.precision
            )));
        }
        if self.write_binary && !cfg!(feature = "npy") {
            return Err(StoreError::UnsupportedFormat(
                "npy support not enabled".into(),
            ));
        }
        Ok(())
    }
}

/// Load options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Which scale stage to build from `vec_scale`.
    pub scale: ScaleMode,
    /// Read `.npy` siblings when present, text otherwise.
    pub prefer_binary: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            scale: ScaleMode::Uniform,
            prefer_binary: cfg!(feature = "npy"),
        }
    }
}

impl LoadOptions {
    pub fn with_scale(scale: ScaleMode) -> Self {
        Self {
            scale,
            ..Default::default()
        }
    }
}
