//! Write side: trained layers and latent statistics to a parameter store.
//!
//! Inverses are computed here, once, so the host runtime never has to
//! invert anything.

use crate::error::Result;
use crate::loader::load_pipeline;
use crate::manifest::{InversionRecord, Manifest};
use crate::options::{ExportOptions, LoadOptions};
use crate::store::{
    dense_dir, LayerParams, ParameterStore, MANIFEST_FILE, MEAN, MIN, PCA_DIR, RANGE, STD,
    VEC_SCALE_DIR,
};
use std::path::{Path, PathBuf};
use timbremap_core::linalg::sub_row_bias;
use timbremap_core::{
    invert, Activation, Error as CoreError, InversionMethod, Matrix, RoundTripReport,
    RoundTripValidator, Vector,
};

/// Per-dimension statistics of latent samples.
#[derive(Debug, Clone, PartialEq)]
pub struct LatentStats {
    pub min: Vector,
    /// `max - min`
    pub range: Vector,
    pub mean: Vector,
    /// Population standard deviation.
    pub std: Vector,
}

impl LatentStats {
    /// One sample per row.
    pub fn from_samples(latent: &Matrix) -> Result<Self> {
        if latent.nrows() == 0 || latent.ncols() == 0 {
            return Err(CoreError::EmptyBatch.into());
        }
        let n = latent.nrows() as f64;
        let d = latent.ncols();
        let mut min = Vector::zeros(d);
        let mut range = Vector::zeros(d);
        let mut mean = Vector::zeros(d);
        let mut std = Vector::zeros(d);
        for (j, col) in latent.column_iter().enumerate() {
            let lo = col.min();
            let hi = col.max();
            let mu = col.sum() / n;
            let var = col.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / n;
            min[j] = lo;
            range[j] = hi - lo;
            mean[j] = mu;
            std[j] = var.sqrt();
        }
        Ok(Self {
            min,
            range,
            mean,
            std,
        })
    }

    pub fn width(&self) -> usize {
        self.min.len()
    }
}

/// Principal-component basis fitted to latent samples.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisFit {
    /// `d x k`, principal directions as columns, strongest first.
    pub weight: Matrix,
    /// Sample mean.
    pub bias: Vector,
    /// Samples in principal coordinates, `n x k`.
    pub projected: Matrix,
}

/// Fit a principal-component basis by SVD of the centered samples.
///
/// Each direction's sign is chosen so its largest-magnitude entry is
/// positive, which makes the result independent of the SVD routine.
pub fn fit_basis(latent: &Matrix) -> Result<BasisFit> {
    if latent.nrows() == 0 || latent.ncols() == 0 {
        return Err(CoreError::EmptyBatch.into());
    }
    let bias = latent.row_mean().transpose();
    let mut centered = latent.clone();
    sub_row_bias(&mut centered, &bias);

    let svd = centered.clone().svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| CoreError::Inversion("SVD did not produce right singular vectors".into()))?;

    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&a, &b| svd.singular_values[b].total_cmp(&svd.singular_values[a]));

    let d = latent.ncols();
    let mut weight = Matrix::zeros(d, order.len());
    for (k, &src) in order.iter().enumerate() {
        let mut dir = v_t.row(src).transpose();
        let pivot = dir.iter().copied().fold(0.0_f64, |acc, v| {
            if v.abs() > acc.abs() {
                v
            } else {
                acc
            }
        });
        if pivot < 0.0 {
            dir = -dir;
        }
        weight.set_column(k, &dir);
    }

    let projected = &centered * &weight;
    Ok(BasisFit {
        weight,
        bias,
        projected,
    })
}

/// Weights, bias and activation of one trained layer (`in x out` weight).
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedLayer {
    pub weight: Matrix,
    pub bias: Vector,
    pub activation: Activation,
}

impl TrainedLayer {
    pub fn new(weight: Matrix, bias: Vector, activation: Activation) -> Self {
        Self {
            weight,
            bias,
            activation,
        }
    }
}

/// Outcome of a whole-model export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub root: PathBuf,
    pub control_width: usize,
    pub inversions: Vec<InversionRecord>,
    /// Round trip through the reloaded directory, when enabled.
    pub validation: Option<RoundTripReport>,
}

impl ExportReport {
    /// Whether any stage had to fall back to a pseudo-inverse.
    pub fn used_pseudo_inverse(&self) -> bool {
        self.inversions
            .iter()
            .any(|r| r.method == InversionMethod::Pseudo)
    }
}

/// Writes one export directory. One writer per directory.
#[derive(Debug)]
pub struct Exporter {
    store: ParameterStore,
    options: ExportOptions,
    manifest: Manifest,
}

impl Exporter {
    pub fn new(root: impl Into<PathBuf>, options: ExportOptions) -> Result<Self> {
        options.validate()?;
        let store = ParameterStore::for_export(root, &options);
        std::fs::create_dir_all(store.root())?;
        Ok(Self {
            store,
            options,
            manifest: Manifest::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn invert_for(&mut self, stage: &str, weight: &Matrix) -> Result<(Matrix, InversionMethod)> {
        let (weight_inv, method) = invert(weight)?;
        if method == InversionMethod::Pseudo {
            tracing::warn!(
                "{}: {}x{} weight is not invertible, exporting pseudo-inverse",
                stage,
                weight.nrows(),
                weight.ncols()
            );
        }
        self.manifest.record(stage, method);
        Ok((weight_inv, method))
    }

    /// Write min, range, mean and std of the latent samples so either scale
    /// mode can be loaded.
    pub fn export_vec_scale(&mut self, latent: &Matrix) -> Result<LatentStats> {
        let stats = LatentStats::from_samples(latent)?;
        self.store.create_dir(VEC_SCALE_DIR)?;
        self.store.write_vector(VEC_SCALE_DIR, MIN, &stats.min)?;
        self.store.write_vector(VEC_SCALE_DIR, RANGE, &stats.range)?;
        self.store.write_vector(VEC_SCALE_DIR, MEAN, &stats.mean)?;
        self.store.write_vector(VEC_SCALE_DIR, STD, &stats.std)?;
        if let Some(dim) = stats.range.iter().position(|&r| r == 0.0) {
            tracing::warn!("Latent dimension {} is constant; uniform scale cannot invert it", dim);
        }
        self.manifest.control_width = stats.width();
        Ok(stats)
    }

    /// Write a basis change (`d x k` weight, `d` bias).
    pub fn export_basis(&mut self, weight: &Matrix, bias: &Vector) -> Result<InversionMethod> {
        if bias.len() != weight.nrows() {
            return Err(CoreError::DimensionMismatch {
                stage: "basis_change",
                expected: weight.nrows(),
                actual: bias.len(),
            }
            .into());
        }
        let (weight_inv, method) = self.invert_for(PCA_DIR, weight)?;
        self.store.write_layer(
            PCA_DIR,
            &LayerParams {
                weight: weight.clone(),
                bias: bias.clone(),
                weight_inv,
                activation: Activation::Linear,
            },
        )?;
        self.manifest.basis_change = true;
        Ok(method)
    }

    /// Write the dense layer at position `idx`.
    pub fn export_dense(&mut self, idx: usize, layer: &TrainedLayer) -> Result<InversionMethod> {
        if layer.bias.len() != layer.weight.ncols() {
            return Err(CoreError::DimensionMismatch {
                stage: "dense_affine",
                expected: layer.weight.ncols(),
                actual: layer.bias.len(),
            }
            .into());
        }
        let dir = dense_dir(idx);
        let (weight_inv, method) = self.invert_for(&dir, &layer.weight)?;
        self.store.write_layer(
            &dir,
            &LayerParams {
                weight: layer.weight.clone(),
                bias: layer.bias.clone(),
                weight_inv,
                activation: layer.activation,
            },
        )?;
        self.manifest.dense_layers = self.manifest.dense_layers.max(idx + 1);
        Ok(method)
    }

    /// Write every layer of a regressor as `dense_layer_0..n`.
    pub fn export_regressor(&mut self, layers: &[TrainedLayer]) -> Result<Vec<InversionMethod>> {
        layers
            .iter()
            .enumerate()
            .map(|(idx, layer)| self.export_dense(idx, layer))
            .collect()
    }

    /// Remove stage directories left by an earlier export that this one did
    /// not write: `pca_layer` without a basis change, and dense layers past
    /// the last one exported.
    pub fn remove_stale_stages(&self) -> Result<()> {
        let mut stale = Vec::new();
        if !self.manifest.basis_change && self.store.has_dir(PCA_DIR) {
            stale.push(PCA_DIR.to_string());
        }
        stale.extend(
            (self.manifest.dense_layers..)
                .map(dense_dir)
                .take_while(|dir| self.store.has_dir(dir)),
        );
        for dir in stale {
            tracing::info!("Removing stale {} from {}", dir, self.root().display());
            std::fs::remove_dir_all(self.store.dir(&dir))?;
        }
        Ok(())
    }

    /// Write the manifest, or remove one left by an earlier export when
    /// manifests are disabled.
    pub fn write_manifest(&self) -> Result<()> {
        if self.options.write_manifest {
            self.manifest.write(self.store.root())?;
        } else {
            let stale = self.store.root().join(MANIFEST_FILE);
            if stale.is_file() {
                std::fs::remove_file(stale)?;
            }
        }
        Ok(())
    }

    /// Full export: regressor layers, optional basis fitted to the latent
    /// samples, latent statistics (in principal coordinates when the basis
    /// is used), manifest, then a round trip through the reloaded directory.
    /// Stages from an earlier export into the same root are removed.
    pub fn export_model(
        &mut self,
        latent: &Matrix,
        layers: &[TrainedLayer],
        basis: bool,
    ) -> Result<ExportReport> {
        self.export_regressor(layers)?;

        if basis {
            let fit = fit_basis(latent)?;
            self.export_basis(&fit.weight, &fit.bias)?;
            self.export_vec_scale(&fit.projected)?;
        } else {
            self.export_vec_scale(latent)?;
        }
        self.remove_stale_stages()?;
        self.write_manifest()?;

        let validation = if self.options.validate {
            Some(self.validate()?)
        } else {
            None
        };

        let report = ExportReport {
            root: self.store.root().to_path_buf(),
            control_width: self.manifest.control_width,
            inversions: self.manifest.inversions.clone(),
            validation,
        };
        tracing::info!(
            "Exported {} dense layers (basis change: {}) to {}{}",
            self.manifest.dense_layers,
            self.manifest.basis_change,
            report.root.display(),
            report
                .validation
                .as_ref()
                .map(|v| format!(", round-trip error {:.3e}", v.mean_abs_error))
                .unwrap_or_default()
        );
        Ok(report)
    }

    /// Reload what has been written and round-trip a control grid.
    pub fn validate(&self) -> Result<RoundTripReport> {
        let options = LoadOptions {
            scale: self.options.scale,
            prefer_binary: self.options.write_binary,
        };
        let pipeline = load_pipeline(self.store.root(), &options)?;
        Ok(RoundTripValidator::default().validate(&pipeline))
    }
}
