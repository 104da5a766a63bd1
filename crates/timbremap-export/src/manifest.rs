//! `manifest.toml`: format version and export record.
//!
//! Optional on read. Directories written before the manifest existed load
//! purely by probing.

use crate::error::{Result, StoreError};
use crate::store::MANIFEST_FILE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use timbremap_core::InversionMethod;

/// Newest layout this build reads and the one it writes.
pub const FORMAT_VERSION: u32 = 1;

/// Which inversion a stage's `weights_inv` came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InversionRecord {
    pub stage: String,
    pub method: InversionMethod,
}

#[derive(Deserialize)]
struct FormatVersion {
    format_version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    #[serde(default)]
    pub generator: String,
    pub control_width: usize,
    #[serde(default)]
    pub dense_layers: usize,
    #[serde(default)]
    pub basis_change: bool,
    #[serde(default)]
    pub inversions: Vec<InversionRecord>,
}

impl Manifest {
    pub fn new(control_width: usize) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            generator: format!("timbremap {}", env!("CARGO_PKG_VERSION")),
            control_width,
            dense_layers: 0,
            basis_change: false,
            inversions: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: impl Into<String>, method: InversionMethod) {
        let stage = stage.into();
        self.inversions.retain(|r| r.stage != stage);
        self.inversions.push(InversionRecord { stage, method });
    }

    /// Inversion method recorded for `stage`, if any.
    pub fn inversion(&self, stage: &str) -> Option<InversionMethod> {
        self.inversions
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| r.method)
    }

    pub fn check_version(&self) -> Result<()> {
        if self.format_version > FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: self.format_version,
                supported: FORMAT_VERSION,
            });
        }
        Ok(())
    }

    /// Parse a manifest. The version is checked before the rest of the
    /// document, whose layout may differ in newer formats.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let version: FormatVersion = toml::from_str(contents)?;
        if version.format_version > FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: version.format_version,
                supported: FORMAT_VERSION,
            });
        }
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// `Ok(None)` when the root has no manifest.
    pub fn read(root: &Path) -> Result<Option<Self>> {
        let path = root.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let manifest = Self::from_toml(&fs::read_to_string(&path)?)?;
        manifest.check_version()?;
        Ok(Some(manifest))
    }

    pub fn write(&self, root: &Path) -> Result<()> {
        let path = root.join(MANIFEST_FILE);
        fs::write(&path, self.to_toml()?)?;
        tracing::debug!("Wrote manifest to {}", path.display());
        Ok(())
    }
}
