//! Round-trip properties of the inference chain.
//!
//! Run with:
//! ```bash
//! cargo test -p timbremap --test round_trip
//! ```

mod helpers;

use helpers::tolerances::*;
use helpers::*;
use proptest::prelude::*;
use tempfile::tempdir;
use timbremap::prelude::*;
use timbremap::{
    erf, erfinv, BasisChange, DenseAffine, GaussianScale, InversionMethod, ParameterStore,
    StageKind, VectorScale,
};

fn map_of(pipeline: Pipeline) -> TimbreMap {
    TimbreMap::from_pipeline(pipeline)
}

/// Identity dense layer on a unit scale reconstructs the grid exactly.
#[test]
fn test_identity_chain_on_default_grid() {
    let pipeline = Pipeline::builder()
        .vector_scale(unit_scale())
        .dense(identity_dense(1.0, Activation::Linear))
        .build()
        .unwrap();
    let report = map_of(pipeline).validate();
    assert_eq!(report.samples, 1000);
    assert!(report.mean_abs_error < AFFINE_EPSILON, "{report:?}");
}

/// Sigmoid on a small gain stays well away from saturation.
#[test]
fn test_sigmoid_chain_on_default_grid() {
    let pipeline = Pipeline::builder()
        .vector_scale(unit_scale())
        .dense(identity_dense(0.01, Activation::Sigmoid))
        .build()
        .unwrap();
    let report = map_of(pipeline).validate();
    assert!(report.is_finite());
    assert!(report.mean_abs_error < SATURATION_EPSILON, "{report:?}");
}

#[test]
fn test_every_activation_round_trips() {
    for activation in [
        Activation::Linear,
        Activation::Sigmoid,
        Activation::Tanh,
        Activation::LeakyRelu,
    ] {
        let pipeline = Pipeline::builder()
            .vector_scale(unit_scale())
            .dense(identity_dense(0.5, activation))
            .dense(identity_dense(1.5, Activation::Linear))
            .build()
            .unwrap();
        let report = map_of(pipeline).validate();
        assert!(
            report.mean_abs_error < STAGE_EPSILON,
            "{activation}: {report:?}"
        );
    }
}

#[test]
fn test_gaussian_scale_with_basis_change() {
    let gauss = GaussianScale::new(
        Vector::from_row_slice(&[0.0, 1.0, -2.0]),
        Vector::from_row_slice(&[1.0, 0.5, 2.0]),
    )
    .unwrap();
    let theta: f64 = 0.3;
    let rotation = Matrix::from_row_slice(
        3,
        3,
        &[theta.cos(), -theta.sin(), 0.0, theta.sin(), theta.cos(), 0.0, 0.0, 0.0, 1.0],
    );
    let (basis, method) = BasisChange::from_basis(rotation, Vector::from_element(3, 0.1)).unwrap();
    assert_eq!(method, InversionMethod::Exact);

    let pipeline = Pipeline::builder()
        .gaussian_scale(gauss)
        .basis_change(basis)
        .dense(identity_dense(0.3, Activation::Tanh))
        .build()
        .unwrap();
    let report = map_of(pipeline).validate();
    assert!(report.mean_abs_error < ERF_EPSILON, "{report:?}");
}

/// A singular layer never raises; the lost dimension shows up as error.
#[test]
fn test_singular_layer_reports_finite_error() {
    let (dense, method) = DenseAffine::from_trained(
        Matrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0]),
        Vector::zeros(3),
        Activation::Linear,
    )
    .unwrap();
    assert_eq!(method, InversionMethod::Pseudo);
    let pipeline = Pipeline::builder()
        .vector_scale(unit_scale())
        .dense(dense)
        .build()
        .unwrap();
    let report = map_of(pipeline).validate();
    assert!(report.is_finite());
    assert!(report.mean_abs_error > STAGE_EPSILON);
}

/// A zero-range scale dimension is reported, not turned into NaN.
#[test]
fn test_degenerate_scale_is_reported() {
    let scale =
        VectorScale::new(Vector::zeros(3), Vector::from_row_slice(&[1.0, 1.0, 0.0])).unwrap();
    let map = map_of(Pipeline::builder().vector_scale(scale).build().unwrap());
    assert!(map.backward_one(&[0.0, 0.0, 0.0]).is_err());
    let report = map.validate();
    assert!(report.mean_abs_error.is_infinite());
    assert!(report.failure.is_some());
}

/// Without any dense layer on disk, forward is the scale then basis alone.
#[test]
fn test_missing_dense_layers_leave_scale_and_basis() {
    let dir = tempdir().unwrap();
    let latent = latent_samples(100, 3);
    let report = Exporter::new(dir.path(), ExportOptions::default())
        .unwrap()
        .export_model(&latent, &[], true)
        .unwrap();
    assert!(report.validation.unwrap().passes(AFFINE_EPSILON));

    // A stray layer after the gap is ignored.
    ParameterStore::new(dir.path())
        .write_layer(
            "dense_layer_1",
            &timbremap::export::LayerParams {
                weight: Matrix::identity(3, 3),
                bias: Vector::zeros(3),
                weight_inv: Matrix::identity(3, 3),
                activation: Activation::Linear,
            },
        )
        .unwrap();

    let map = TimbreMap::builder().root(dir.path()).build().unwrap();
    let kinds: Vec<_> = map.pipeline().stages().iter().map(|s| s.kind()).collect();
    assert_eq!(kinds, vec![StageKind::VectorScale, StageKind::BasisChange]);

    let fit = timbremap::fit_basis(&latent).unwrap();
    let stats = timbremap::LatentStats::from_samples(&fit.projected).unwrap();
    let control = [0.25, 0.5, 0.75];
    let projected: Vec<f64> = (0..3)
        .map(|j| control[j] * stats.range[j] + stats.min[j])
        .collect();
    let expected: Vec<f64> = (0..3)
        .map(|j| (0..3).map(|k| projected[k] * fit.weight[(j, k)]).sum::<f64>() + fit.bias[j])
        .collect();

    let output = map.forward_one(&control).unwrap();
    assert!(abs_diff(&output, &expected) < AFFINE_EPSILON, "{output:?} vs {expected:?}");
}

/// Wide control spaces get a coarser grid instead of an unbounded one.
#[test]
fn test_wide_control_space_validates() {
    let width = 8;
    let scale =
        VectorScale::new(Vector::zeros(width), Vector::from_element(width, 1.0)).unwrap();
    let (dense, _) = DenseAffine::from_trained(
        Matrix::identity(width, width) * 2.0,
        Vector::zeros(width),
        Activation::Linear,
    )
    .unwrap();
    let map = map_of(Pipeline::builder().vector_scale(scale).dense(dense).build().unwrap());
    let report = map.validate();
    assert_eq!(report.samples, 4usize.pow(8));
    assert!(report.passes(AFFINE_EPSILON), "{report:?}");
}

#[test]
fn test_too_wide_control_space_is_reported() {
    let width = 20;
    let scale =
        VectorScale::new(Vector::zeros(width), Vector::from_element(width, 1.0)).unwrap();
    let (dense, _) = DenseAffine::from_trained(
        Matrix::identity(width, width),
        Vector::zeros(width),
        Activation::Linear,
    )
    .unwrap();
    let map = map_of(Pipeline::builder().vector_scale(scale).dense(dense).build().unwrap());
    let report = map.validate();
    assert!(!report.is_finite());
    assert!(matches!(
        report.failure,
        Some(timbremap::core::Error::GridTooLarge { dims: 20, .. })
    ));
}

#[test]
fn test_batch_rows_are_independent() {
    let pipeline = Pipeline::builder()
        .vector_scale(unit_scale())
        .dense(identity_dense(0.7, Activation::Tanh))
        .build()
        .unwrap();
    let map = map_of(pipeline);
    let rows = vec![vec![0.1, 0.2, 0.3], vec![0.9, 0.8, 0.7], vec![0.5, 0.5, 0.5]];
    let batch = map.forward_rows(&rows).unwrap();
    for (row, out) in rows.iter().zip(&batch) {
        assert_eq!(&map.forward_one(row).unwrap(), out);
    }
}

proptest! {
    #[test]
    fn prop_erf_inverse_pair(x in -0.999f64..0.999) {
        prop_assert!((erf(erfinv(x).unwrap()) - x).abs() < ERF_EPSILON);
    }

    #[test]
    fn prop_linear_chain_round_trip(
        c0 in 0.0f64..1.0,
        c1 in 0.0f64..1.0,
        c2 in 0.0f64..1.0,
        gain in 0.1f64..10.0,
    ) {
        let pipeline = Pipeline::builder()
            .vector_scale(unit_scale())
            .dense(identity_dense(gain, Activation::Linear))
            .build()
            .unwrap();
        let control = [c0, c1, c2];
        let map = map_of(pipeline);
        let back = map.backward_one(&map.forward_one(&control).unwrap()).unwrap();
        prop_assert!(abs_diff(&back, &control) < STAGE_EPSILON);
    }
}
