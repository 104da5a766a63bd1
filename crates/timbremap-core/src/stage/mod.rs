//! Invertible inference stages.
//!
//! Every stage maps a batch of fixed-width row vectors forward (control
//! toward latent/output) and backward (the inverse direction). [`Stage`] is a
//! closed set of variants dispatched with a single `match`, so there is no
//! per-element virtual call.

mod basis;
mod dense;
mod scale;

pub use basis::BasisChange;
pub use dense::DenseAffine;
pub use scale::{GaussianScale, VectorScale, PROBIT_EPSILON};

use crate::linalg::Matrix;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminator for [`Stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    VectorScale,
    GaussianScale,
    BasisChange,
    DenseAffine,
}

impl StageKind {
    /// VectorScale and GaussianScale are interchangeable first stages.
    pub fn is_scale(&self) -> bool {
        matches!(self, StageKind::VectorScale | StageKind::GaussianScale)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::VectorScale => VectorScale::NAME,
            StageKind::GaussianScale => GaussianScale::NAME,
            StageKind::BasisChange => BasisChange::NAME,
            StageKind::DenseAffine => DenseAffine::NAME,
        };
        f.write_str(name)
    }
}

/// One invertible step of the inference chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    VectorScale(VectorScale),
    GaussianScale(GaussianScale),
    BasisChange(BasisChange),
    DenseAffine(DenseAffine),
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::VectorScale(_) => StageKind::VectorScale,
            Stage::GaussianScale(_) => StageKind::GaussianScale,
            Stage::BasisChange(_) => StageKind::BasisChange,
            Stage::DenseAffine(_) => StageKind::DenseAffine,
        }
    }

    pub fn input_width(&self) -> usize {
        match self {
            Stage::VectorScale(s) => s.width(),
            Stage::GaussianScale(s) => s.width(),
            Stage::BasisChange(s) => s.input_width(),
            Stage::DenseAffine(s) => s.input_width(),
        }
    }

    pub fn output_width(&self) -> usize {
        match self {
            Stage::VectorScale(s) => s.width(),
            Stage::GaussianScale(s) => s.width(),
            Stage::BasisChange(s) => s.output_width(),
            Stage::DenseAffine(s) => s.output_width(),
        }
    }

    pub fn forward(&self, batch: &Matrix) -> Result<Matrix> {
        match self {
            Stage::VectorScale(s) => s.forward(batch),
            Stage::GaussianScale(s) => s.forward(batch),
            Stage::BasisChange(s) => s.forward(batch),
            Stage::DenseAffine(s) => s.forward(batch),
        }
    }

    pub fn backward(&self, batch: &Matrix) -> Result<Matrix> {
        match self {
            Stage::VectorScale(s) => s.backward(batch),
            Stage::GaussianScale(s) => s.backward(batch),
            Stage::BasisChange(s) => s.backward(batch),
            Stage::DenseAffine(s) => s.backward(batch),
        }
    }
}

impl From<VectorScale> for Stage {
    fn from(s: VectorScale) -> Self {
        Stage::VectorScale(s)
    }
}

impl From<GaussianScale> for Stage {
    fn from(s: GaussianScale) -> Self {
        Stage::GaussianScale(s)
    }
}

impl From<BasisChange> for Stage {
    fn from(s: BasisChange) -> Self {
        Stage::BasisChange(s)
    }
}

impl From<DenseAffine> for Stage {
    fn from(s: DenseAffine) -> Self {
        Stage::DenseAffine(s)
    }
}
