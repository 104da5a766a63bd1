//! Builder for configuring and loading a `TimbreMap`.

use crate::config::TimbreMapConfig;
use crate::{Error, Result, TimbreMap};
use std::path::{Path, PathBuf};
use timbremap_core::{RoundTripValidator, ScaleMode};
use timbremap_export::{LoadOptions, PipelineConfig};

/// The export directory is required; everything else has defaults. A
/// `timbremap.toml` inside the directory is picked up unless a config was
/// given explicitly.
///
/// # Example
///
/// ```ignore
/// use timbremap::prelude::*;
///
/// let map = TimbreMap::builder()
///     .root("model/")
///     .scale(ScaleMode::Normal)
///     .build()?;
///
/// let latent = map.forward_one(&[0.2, 0.5, 0.8])?;
/// let control = map.backward_one(&latent)?;
/// ```
#[derive(Debug, Default)]
pub struct TimbreMapBuilder {
    root: Option<PathBuf>,
    config: Option<TimbreMapConfig>,
    scale: Option<ScaleMode>,
    prefer_binary: Option<bool>,
    validator: Option<RoundTripValidator>,
}

impl TimbreMapBuilder {
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Default: uniform
    pub fn scale(mut self, mode: ScaleMode) -> Self {
        self.scale = Some(mode);
        self
    }

    /// Default: true when built with `.npy` support
    pub fn prefer_binary(mut self, prefer: bool) -> Self {
        self.prefer_binary = Some(prefer);
        self
    }

    pub fn validator(mut self, validator: RoundTripValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Explicit settings override these.
    pub fn config(mut self, config: TimbreMapConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        Ok(self.config(TimbreMapConfig::from_file(path)?))
    }

    pub fn build(self) -> Result<TimbreMap> {
        let root = self
            .root
            .ok_or_else(|| Error::InvalidConfig("export directory not set".into()))?;

        let config = match self.config {
            Some(config) => {
                config.validate()?;
                config
            }
            None => TimbreMapConfig::sidecar(&root)?.unwrap_or_default(),
        };

        let options = LoadOptions {
            scale: self.scale.unwrap_or(config.load.scale),
            prefer_binary: self.prefer_binary.unwrap_or(config.load.prefer_binary),
        };
        let validator = self
            .validator
            .unwrap_or_else(|| config.validation.into());

        let source = PipelineConfig::probe(&root, &options)?;
        let pipeline = source.load()?;
        Ok(TimbreMap::from_parts(pipeline, Some(source), validator))
    }
}
