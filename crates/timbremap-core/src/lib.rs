//! Invertible inference chain for latent-to-control mapping.
//!
//! Pure linear algebra and elementwise math, no I/O. A [`Pipeline`] is an
//! immutable sequence of [`Stage`]s:
//!
//! ```text
//! control --VectorScale|GaussianScale--> latent --[BasisChange]--> latent --DenseAffine*--> output
//! ```
//!
//! Every stage has a `forward` and a `backward`, and the pipeline's backward
//! pass runs the stages in reverse so an observed output can be mapped back
//! to the control vector that produced it.
//!
//! ## Usage
//!
//! ```rust
//! use timbremap_core::{Activation, DenseAffine, Matrix, Pipeline, RoundTripValidator, Vector, VectorScale};
//!
//! let scale = VectorScale::new(Vector::zeros(3), Vector::from_element(3, 1.0))?;
//! let (dense, _method) =
//!     DenseAffine::from_trained(Matrix::identity(3, 3), Vector::zeros(3), Activation::Linear)?;
//!
//! let pipeline = Pipeline::builder().vector_scale(scale).dense(dense).build()?;
//! let latent = pipeline.forward_one(&[0.2, 0.4, 0.6])?;
//! let control = pipeline.backward_one(&latent)?;
//!
//! let report = RoundTripValidator::default().validate(&pipeline);
//! assert!(report.mean_abs_error < 1e-9);
//! # Ok::<(), timbremap_core::Error>(())
//! ```

mod error;
pub use error::{Error, Result};

pub mod activation;
pub mod config;
pub mod linalg;
pub mod pipeline;
pub mod special;
pub mod stage;
pub mod validate;

pub use activation::Activation;
pub use config::ScaleMode;
pub use linalg::{invert, InversionMethod, Matrix, Vector};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use special::{erf, erfinv};
pub use stage::{BasisChange, DenseAffine, GaussianScale, Stage, StageKind, VectorScale};
pub use validate::{round_trip, RoundTripReport, RoundTripValidator};
