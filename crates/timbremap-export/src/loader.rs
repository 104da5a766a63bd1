//! Read side: probe an export directory once, then build a [`Pipeline`].

use crate::error::{LoadError, StoreError};
use crate::manifest::Manifest;
use crate::options::LoadOptions;
use crate::store::{dense_dir, ParameterStore, MEAN, MIN, PCA_DIR, RANGE, STD, VEC_SCALE_DIR};
use std::path::{Path, PathBuf};
use timbremap_core::{BasisChange, DenseAffine, GaussianScale, Pipeline, ScaleMode, VectorScale};

/// What an export directory contains, established by probing.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    root: PathBuf,
    options: LoadOptions,
    basis_change: bool,
    dense_layers: usize,
    manifest: Option<Manifest>,
}

impl PipelineConfig {
    /// Probe `root`. `vec_scale` is required, `pca_layer` is optional, and
    /// dense layers are counted from `dense_layer_0` up to the first gap.
    /// A manifest that disagrees with the stages found is an error.
    pub fn probe(root: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, LoadError> {
        let root = root.as_ref().to_path_buf();
        let store = ParameterStore::for_load(&root, options);
        if !root.is_dir() {
            return Err(StoreError::Missing(root));
        }
        if !store.has_dir(VEC_SCALE_DIR) {
            return Err(StoreError::Missing(store.dir(VEC_SCALE_DIR)));
        }

        let manifest = Manifest::read(&root)?;
        let basis_change = store.has_dir(PCA_DIR);
        let dense_layers = (0..)
            .take_while(|&idx| store.has_dir(&dense_dir(idx)))
            .count();

        if let Some(m) = &manifest {
            if m.dense_layers != dense_layers || m.basis_change != basis_change {
                return Err(StoreError::Manifest(format!(
                    "{} lists {} dense layers (basis: {}), directory has {} (basis: {})",
                    root.display(),
                    m.dense_layers,
                    m.basis_change,
                    dense_layers,
                    basis_change
                )));
            }
        }

        Ok(Self {
            root,
            options: *options,
            basis_change,
            dense_layers,
            manifest,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.options.scale
    }

    pub fn has_basis_change(&self) -> bool {
        self.basis_change
    }

    pub fn dense_layers(&self) -> usize {
        self.dense_layers
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// Read every stage and assemble the pipeline.
    pub fn load(&self) -> Result<Pipeline, LoadError> {
        let store = ParameterStore::for_load(&self.root, &self.options);
        let mut builder = Pipeline::builder();

        builder = match self.options.scale {
            ScaleMode::Uniform => builder.vector_scale(VectorScale::new(
                store.read_vector(VEC_SCALE_DIR, MIN)?,
                store.read_vector(VEC_SCALE_DIR, RANGE)?,
            )?),
            ScaleMode::Normal => builder.gaussian_scale(GaussianScale::new(
                store.read_vector(VEC_SCALE_DIR, MEAN)?,
                store.read_vector(VEC_SCALE_DIR, STD)?,
            )?),
        };

        if self.basis_change {
            let p = store.read_basis_layer(PCA_DIR)?;
            builder = builder.basis_change(BasisChange::new(p.weight, p.weight_inv, p.bias)?);
        }

        for idx in 0..self.dense_layers {
            let p = store.read_layer(&dense_dir(idx))?;
            builder = builder.dense(DenseAffine::new(p.weight, p.bias, p.weight_inv, p.activation)?);
        }

        let pipeline = builder.build()?;
        tracing::info!(
            "Loaded pipeline from {}: {} scale, basis change: {}, {} dense layers, {} -> {}",
            self.root.display(),
            self.options.scale,
            pipeline.has_basis_change(),
            pipeline.dense_count(),
            pipeline.input_width(),
            pipeline.output_width()
        );
        Ok(pipeline)
    }
}

/// Probe and load in one step.
pub fn load_pipeline(root: impl AsRef<Path>, options: &LoadOptions) -> Result<Pipeline, LoadError> {
    PipelineConfig::probe(root, options)?.load()
}
