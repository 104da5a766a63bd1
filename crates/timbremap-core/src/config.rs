//! Scale-stage selection.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which scale stage maps the control vector into latent range.
///
/// Both read the same `vec_scale` directory: `Uniform` uses `min`/`range`,
/// `Normal` uses `mean`/`std`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    #[default]
    Uniform,
    Normal,
}

impl FromStr for ScaleMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(ScaleMode::Uniform),
            "normal" | "gaussian" => Ok(ScaleMode::Normal),
            other => Err(Error::InvalidStage(format!("unknown scale mode: {}", other))),
        }
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleMode::Uniform => write!(f, "uniform"),
            ScaleMode::Normal => write!(f, "normal"),
        }
    }
}
