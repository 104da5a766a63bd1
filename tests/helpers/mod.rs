//! Test helpers and fixtures for TimbreMap integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `AFFINE_EPSILON` (1e-9): Exact affine chains
//! - `STAGE_EPSILON` (1e-6): Single affine stage, pseudo-inverse
//! - `ERF_EPSILON` (1e-3): Gaussian scale
//! - `SATURATION_EPSILON` (1e-2): Sigmoid near saturation

#![allow(dead_code)]

pub mod tolerances;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use timbremap::prelude::*;
use timbremap::{DenseAffine, VectorScale};

/// Control width of the reference model.
pub const TEST_WIDTH: usize = 3;

/// `VectorScale(min 0, range 1)`: controls pass through unchanged.
pub fn unit_scale() -> VectorScale {
    VectorScale::new(Vector::zeros(TEST_WIDTH), Vector::from_element(TEST_WIDTH, 1.0))
        .expect("Failed to build unit scale")
}

/// `identity * gain` dense layer with zero bias.
pub fn identity_dense(gain: f64, activation: Activation) -> DenseAffine {
    DenseAffine::from_trained(
        Matrix::identity(TEST_WIDTH, TEST_WIDTH) * gain,
        Vector::zeros(TEST_WIDTH),
        activation,
    )
    .expect("Failed to build dense layer")
    .0
}

/// Same layer as [`identity_dense`], in trained-layer form for the exporter.
pub fn identity_layer(gain: f64, activation: Activation) -> TrainedLayer {
    TrainedLayer::new(
        Matrix::identity(TEST_WIDTH, TEST_WIDTH) * gain,
        Vector::zeros(TEST_WIDTH),
        activation,
    )
}

/// Deterministic latent samples with correlated axes.
pub fn latent_samples(n: usize, seed: u64) -> Matrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f64> = (0..n)
        .flat_map(|_| {
            let (a, b, c): (f64, f64, f64) = (rng.gen(), rng.gen(), rng.gen());
            [3.0 * a - 1.5, 0.5 * b + 0.4 * a + 0.2, 2.0 * c]
        })
        .collect();
    Matrix::from_row_slice(n, TEST_WIDTH, &data)
}

/// A small trained regressor: a mixing layer then a tanh layer.
pub fn regressor() -> Vec<TrainedLayer> {
    vec![
        TrainedLayer::new(
            Matrix::from_row_slice(3, 3, &[1.0, 0.2, 0.0, -0.1, 0.9, 0.3, 0.0, 0.1, 1.1]),
            Vector::from_row_slice(&[0.05, -0.02, 0.1]),
            Activation::Linear,
        ),
        TrainedLayer::new(
            Matrix::identity(3, 3) * 0.2,
            Vector::zeros(3),
            Activation::Tanh,
        ),
    ]
}

/// Export the reference model into `root`.
pub fn export_reference(root: &Path, options: ExportOptions, basis: bool) -> timbremap::ExportReport {
    Exporter::new(root, options)
        .expect("Failed to create exporter")
        .export_model(&latent_samples(200, 7), &regressor(), basis)
        .expect("Export failed")
}

/// Sum of absolute differences between two vectors.
pub fn abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}
