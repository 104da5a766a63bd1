//! # TimbreMap Export
//!
//! Parameter store for TimbreMap inference chains:
//! - **Exporter**: trained layers and latent statistics to disk, with
//!   inverses computed once at export time
//! - **Loader**: probe an export directory and build a
//!   [`timbremap_core::Pipeline`]
//! - **Manifest**: optional `manifest.toml` with format version and the
//!   inversion method used per stage
//!
//! ```ignore
//! use timbremap_export::{Exporter, ExportOptions, LoadOptions, TrainedLayer};
//!
//! let mut exporter = Exporter::new("model/", ExportOptions::default())?;
//! let report = exporter.export_model(&latent, &layers, true)?;
//! println!("round trip: {:?}", report.validation);
//!
//! let pipeline = timbremap_export::load_pipeline("model/", &LoadOptions::default())?;
//! ```
//!
//! ## Feature Flags
//!
//! - `npy` (default): write and prefer NumPy `.npy` siblings

pub mod error;
pub mod exporter;
pub mod format;
pub mod loader;
pub mod manifest;
mod options;
pub mod store;

pub use error::{LoadError, Result, StoreError};
pub use exporter::{fit_basis, BasisFit, ExportReport, Exporter, LatentStats, TrainedLayer};
pub use loader::{load_pipeline, PipelineConfig};
pub use manifest::{InversionRecord, Manifest, FORMAT_VERSION};
pub use options::{ExportOptions, LoadOptions, DEFAULT_PRECISION};
pub use store::{LayerParams, ParameterStore, ShapeHint};
