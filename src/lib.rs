//! # TimbreMap - invertible latent-to-control mapping
//!
//! Exports a trained latent-space regressor as plain numeric parameters and
//! runs the resulting chain in both directions.
//!
//! ## Architecture
//!
//! TimbreMap is an umbrella crate that coordinates:
//! - **timbremap-core** - Stages, pipeline composition, erf/erfinv, round-trip validator
//! - **timbremap-export** - Parameter store, exporter, loader, manifest
//!
//! ## Quick Start
//!
//! ```ignore
//! use timbremap::prelude::*;
//!
//! // Write a model directory
//! let mut exporter = Exporter::new("model/", ExportOptions::default())?;
//! let report = exporter.export_model(&latent, &layers, true)?;
//!
//! // Load it back and map in both directions
//! let map = TimbreMap::builder().root("model/").build()?;
//! let output = map.forward_one(&[0.2, 0.5, 0.8])?;
//! let control = map.backward_one(&output)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default) - the `timbremap` command-line tool

/// Re-export of timbremap-core for direct access
pub use timbremap_core as core;

/// Re-export of timbremap-export for direct access
pub use timbremap_export as export;

pub use timbremap_core::{
    erf, erfinv, invert, round_trip, Activation, BasisChange, DenseAffine, GaussianScale,
    InversionMethod, Matrix, Pipeline, PipelineBuilder, RoundTripReport, RoundTripValidator,
    ScaleMode, Stage, StageKind, Vector, VectorScale,
};

pub use timbremap_export::{
    fit_basis, load_pipeline, ExportOptions, ExportReport, Exporter, LatentStats, LoadError,
    LoadOptions, Manifest, ParameterStore, PipelineConfig, StoreError, TrainedLayer,
};

mod builder;
pub mod config;
mod engine;
mod error;

pub use builder::TimbreMapBuilder;
pub use config::TimbreMapConfig;
pub use engine::TimbreMap;
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{TimbreMap, TimbreMapBuilder, TimbreMapConfig};

    pub use crate::core::{Activation, Matrix, Pipeline, RoundTripReport, ScaleMode, Vector};

    pub use crate::export::{ExportOptions, Exporter, LoadOptions, TrainedLayer};
}
