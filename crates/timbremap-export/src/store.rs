//! Parameter store: flattened matrices and activation tags in a fixed
//! directory layout.
//!
//! ```text
//! <root>/
//!   manifest.toml
//!   vec_scale/      min, range, mean, std
//!   pca_layer/      weights, biases, weights_inv
//!   dense_layer_N/  weights, biases, weights_inv, activation
//! ```
//!
//! Every numeric file is written as text plus an optional `.npy` sibling.

use crate::error::{Result, StoreError};
use crate::format::{text, RawArray};
use crate::options::{ExportOptions, LoadOptions, DEFAULT_PRECISION};
use std::fs;
use std::path::{Path, PathBuf};
use timbremap_core::linalg::{from_row_major, to_row_major};
use timbremap_core::{Activation, Matrix, Vector};

#[cfg(feature = "npy")]
use crate::format::npy;

pub const VEC_SCALE_DIR: &str = "vec_scale";
pub const PCA_DIR: &str = "pca_layer";
pub const DENSE_DIR_PREFIX: &str = "dense_layer_";
pub const MANIFEST_FILE: &str = "manifest.toml";

pub const MIN: &str = "min";
pub const RANGE: &str = "range";
pub const MEAN: &str = "mean";
pub const STD: &str = "std";
pub const WEIGHTS: &str = "weights";
pub const BIASES: &str = "biases";
pub const WEIGHTS_INV: &str = "weights_inv";
pub const ACTIVATION: &str = "activation";

const NPY_EXT: &str = "npy";

/// Directory name of the dense layer at `idx`.
pub fn dense_dir(idx: usize) -> String {
    format!("{}{}", DENSE_DIR_PREFIX, idx)
}

/// The one dimension of a stored matrix that text files let us know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeHint {
    Rows(usize),
    Cols(usize),
}

impl ShapeHint {
    fn resolve(self, len: usize) -> Option<(usize, usize)> {
        let known = match self {
            ShapeHint::Rows(n) | ShapeHint::Cols(n) => n,
        };
        if known == 0 || len % known != 0 {
            return None;
        }
        let other = len / known;
        Some(match self {
            ShapeHint::Rows(r) => (r, other),
            ShapeHint::Cols(c) => (other, c),
        })
    }

    fn accepts(self, shape: (usize, usize)) -> bool {
        match self {
            ShapeHint::Rows(r) => shape.0 == r,
            ShapeHint::Cols(c) => shape.1 == c,
        }
    }
}

/// Weight, bias and inverse of one affine layer as stored on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerParams {
    pub weight: Matrix,
    pub bias: Vector,
    pub weight_inv: Matrix,
    pub activation: Activation,
}

/// Reads and writes parameter files under a root directory.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    root: PathBuf,
    precision: usize,
    write_binary: bool,
    prefer_binary: bool,
}

impl ParameterStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            precision: DEFAULT_PRECISION,
            write_binary: cfg!(feature = "npy"),
            prefer_binary: cfg!(feature = "npy"),
        }
    }

    /// Store configured for writing.
    pub fn for_export(root: impl Into<PathBuf>, options: &ExportOptions) -> Self {
        Self {
            precision: options.precision,
            write_binary: options.write_binary,
            ..Self::new(root)
        }
    }

    /// Store configured for reading.
    pub fn for_load(root: impl Into<PathBuf>, options: &LoadOptions) -> Self {
        Self {
            prefer_binary: options.prefer_binary,
            ..Self::new(root)
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn has_dir(&self, name: &str) -> bool {
        self.dir(name).is_dir()
    }

    pub fn create_dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.dir(name);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn write_values(&self, dir: &str, name: &str, shape: &[usize], data: &[f64]) -> Result<()> {
        let path = self.dir(dir).join(name);
        text::write(&path, data, self.precision)?;

        // A sibling from an earlier export would shadow the new text.
        let binary = path.with_extension(NPY_EXT);
        #[cfg(feature = "npy")]
        if self.write_binary {
            npy::write(&binary, shape, data)?;
        } else if binary.is_file() {
            fs::remove_file(&binary)?;
        }
        #[cfg(not(feature = "npy"))]
        {
            let _ = shape;
            if binary.is_file() {
                fs::remove_file(&binary)?;
            }
        }

        Ok(())
    }

    pub fn write_vector(&self, dir: &str, name: &str, v: &Vector) -> Result<()> {
        self.write_values(dir, name, &[v.len()], v.as_slice())
    }

    /// Row-major, matching the in-memory `in x out` layout.
    pub fn write_matrix(&self, dir: &str, name: &str, m: &Matrix) -> Result<()> {
        self.write_values(dir, name, &[m.nrows(), m.ncols()], &to_row_major(m))
    }

    pub fn write_activation(&self, dir: &str, activation: Activation) -> Result<()> {
        let path = self.dir(dir).join(ACTIVATION);
        fs::write(&path, format!("{}\n", activation.tag()))?;
        tracing::debug!("Wrote activation {} to {}", activation, path.display());
        Ok(())
    }

    /// Write weights, biases and inverse, plus the activation tag when it
    /// is not `linear`.
    pub fn write_layer(&self, dir: &str, params: &LayerParams) -> Result<()> {
        self.create_dir(dir)?;
        self.write_matrix(dir, WEIGHTS, &params.weight)?;
        self.write_vector(dir, BIASES, &params.bias)?;
        self.write_matrix(dir, WEIGHTS_INV, &params.weight_inv)?;
        if params.activation.needs_tag_file() {
            self.write_activation(dir, params.activation)?;
        } else {
            let stale = self.dir(dir).join(ACTIVATION);
            if stale.is_file() {
                fs::remove_file(stale)?;
            }
        }
        Ok(())
    }

    /// Binary sibling when preferred and present, text otherwise.
    fn read_raw(&self, dir: &str, name: &str) -> Result<RawArray> {
        let path = self.dir(dir).join(name);

        #[cfg(feature = "npy")]
        if self.prefer_binary {
            let binary = path.with_extension(NPY_EXT);
            if binary.is_file() {
                match npy::read(&binary) {
                    Err(StoreError::Npy { reason, .. }) if path.is_file() => {
                        tracing::warn!(
                            "Unreadable binary sibling {} ({}), reading text",
                            binary.display(),
                            reason
                        );
                    }
                    result => return result,
                }
            } else if path.is_file() {
                tracing::warn!("No binary sibling for {}, reading text", path.display());
            }
        }

        if !path.is_file() {
            return Err(StoreError::Missing(path));
        }
        text::read(&path)
    }

    pub fn read_vector(&self, dir: &str, name: &str) -> Result<Vector> {
        let raw = self.read_raw(dir, name)?;
        if let Some(shape) = &raw.shape {
            if shape.iter().filter(|&&d| d != 1).count() > 1 {
                return Err(StoreError::Shape {
                    path: self.dir(dir).join(name),
                    reason: format!("expected a vector, found shape {:?}", shape),
                });
            }
        }
        if raw.is_empty() {
            return Err(StoreError::Shape {
                path: self.dir(dir).join(name),
                reason: "no values".into(),
            });
        }
        Ok(Vector::from_vec(raw.data))
    }

    /// Read a matrix. Binary siblings carry their own shape; for text the
    /// missing dimension is derived from `hint`.
    pub fn read_matrix(&self, dir: &str, name: &str, hint: ShapeHint) -> Result<Matrix> {
        let path = self.dir(dir).join(name);
        let raw = self.read_raw(dir, name)?;
        let shape_err = |reason: String| StoreError::Shape {
            path: path.clone(),
            reason,
        };

        let (rows, cols) = match raw.shape.as_deref() {
            Some(&[r, c]) => (r, c),
            Some(other) => {
                return Err(shape_err(format!(
                    "expected a 2-D matrix, found shape {:?}",
                    other
                )))
            }
            None => hint.resolve(raw.len()).ok_or_else(|| {
                shape_err(format!("{} values do not fit {:?}", raw.len(), hint))
            })?,
        };
        if !hint.accepts((rows, cols)) {
            return Err(shape_err(format!(
                "shape ({}, {}) does not match {:?}",
                rows, cols, hint
            )));
        }
        Ok(from_row_major(rows, cols, &raw.data)?)
    }

    /// Missing file means `linear`.
    pub fn read_activation(&self, dir: &str) -> Result<Activation> {
        let path = self.dir(dir).join(ACTIVATION);
        if !path.is_file() {
            return Ok(Activation::Linear);
        }
        let contents = fs::read_to_string(&path)?;
        let tag = contents.lines().next().unwrap_or("").trim();
        if tag.is_empty() {
            return Ok(Activation::Linear);
        }
        Ok(Activation::from_tag_or_linear(tag))
    }

    /// Read one affine layer. The output width comes from the bias length.
    pub fn read_layer(&self, dir: &str) -> Result<LayerParams> {
        let bias = self.read_vector(dir, BIASES)?;
        let weight = self.read_matrix(dir, WEIGHTS, ShapeHint::Cols(bias.len()))?;
        let weight_inv = self.read_matrix(dir, WEIGHTS_INV, ShapeHint::Rows(bias.len()))?;
        let activation = self.read_activation(dir)?;
        Ok(LayerParams {
            weight,
            bias,
            weight_inv,
            activation,
        })
    }

    /// Read a basis-change layer. Here the bias lives on the weight's rows,
    /// and any activation file is ignored.
    pub fn read_basis_layer(&self, dir: &str) -> Result<LayerParams> {
        let bias = self.read_vector(dir, BIASES)?;
        let weight = self.read_matrix(dir, WEIGHTS, ShapeHint::Rows(bias.len()))?;
        let weight_inv = self.read_matrix(dir, WEIGHTS_INV, ShapeHint::Cols(bias.len()))?;
        Ok(LayerParams {
            weight,
            bias,
            weight_inv,
            activation: Activation::Linear,
        })
    }
}
