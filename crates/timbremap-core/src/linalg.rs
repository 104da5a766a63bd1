//! Matrix aliases and the small amount of linear algebra the stages need.
//!
//! Batches are `n x d` matrices with one vector per row. Per-dimension
//! parameters (bias, min, range, mean, std) are column vectors of length `d`
//! that broadcast across rows.

use crate::{Error, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type Matrix = DMatrix<f64>;
pub type Vector = DVector<f64>;

/// Relative singular-value cutoff for the pseudo-inverse.
pub const PINV_RCOND: f64 = 1e-15;

/// How a weight matrix's inverse was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InversionMethod {
    /// True inverse of a square, non-singular matrix.
    Exact,
    /// Moore-Penrose pseudo-inverse (non-square or singular).
    Pseudo,
}

impl fmt::Display for InversionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InversionMethod::Exact => write!(f, "exact"),
            InversionMethod::Pseudo => write!(f, "pseudo"),
        }
    }
}

/// Invert `weight`, falling back to the pseudo-inverse.
///
/// Never fails for finite input: a singular or non-square matrix yields its
/// pseudo-inverse and [`InversionMethod::Pseudo`].
pub fn invert(weight: &Matrix) -> Result<(Matrix, InversionMethod)> {
    if weight.is_empty() {
        return Err(Error::Inversion("empty matrix".into()));
    }
    if weight.iter().any(|v| !v.is_finite()) {
        return Err(Error::Inversion("matrix contains non-finite values".into()));
    }

    if weight.is_square() {
        if let Some(inverse) = weight.clone().try_inverse() {
            if inverse.iter().all(|v| v.is_finite()) {
                return Ok((inverse, InversionMethod::Exact));
            }
        }
    }

    pseudo_inverse(weight).map(|pinv| (pinv, InversionMethod::Pseudo))
}

/// Moore-Penrose pseudo-inverse via SVD.
pub fn pseudo_inverse(weight: &Matrix) -> Result<Matrix> {
    let svd = weight.clone().svd(true, true);
    let largest = svd.singular_values.max();
    let cutoff = (PINV_RCOND * largest).max(f64::MIN_POSITIVE);
    svd.pseudo_inverse(cutoff)
        .map_err(|e| Error::Inversion(e.to_string()))
}

/// Build a matrix from row-major data.
pub fn from_row_major(rows: usize, cols: usize, data: &[f64]) -> Result<Matrix> {
    if rows * cols != data.len() {
        return Err(Error::InvalidStage(format!(
            "{} values cannot fill a {}x{} matrix",
            data.len(),
            rows,
            cols
        )));
    }
    Ok(Matrix::from_row_slice(rows, cols, data))
}

/// Flatten a matrix in row-major order.
pub fn to_row_major(m: &Matrix) -> Vec<f64> {
    m.transpose().as_slice().to_vec()
}

/// Stack equal-length rows into a batch.
pub fn batch_from_rows(rows: &[Vec<f64>]) -> Result<Matrix> {
    let Some(first) = rows.first() else {
        return Err(Error::EmptyBatch);
    };
    let width = first.len();
    let mut data = Vec::with_capacity(rows.len() * width);
    for row in rows {
        if row.len() != width {
            return Err(Error::DimensionMismatch {
                stage: "batch",
                expected: width,
                actual: row.len(),
            });
        }
        data.extend_from_slice(row);
    }
    from_row_major(rows.len(), width, &data)
}

/// Evenly spaced values over `[low, high]`, endpoints included.
pub fn linspace(low: f64, high: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![low],
        _ => {
            let step = (high - low) / (steps - 1) as f64;
            (0..steps).map(|i| low + step * i as f64).collect()
        }
    }
}

#[inline]
pub(crate) fn check_width(stage: &'static str, batch: &Matrix, expected: usize) -> Result<()> {
    if batch.nrows() == 0 {
        return Err(Error::EmptyBatch);
    }
    if batch.ncols() != expected {
        return Err(Error::DimensionMismatch {
            stage,
            expected,
            actual: batch.ncols(),
        });
    }
    Ok(())
}

/// `m[i, j] += bias[j]` for every row.
#[inline]
pub fn add_row_bias(m: &mut Matrix, bias: &Vector) {
    for (j, mut col) in m.column_iter_mut().enumerate() {
        let b = bias[j];
        for v in col.iter_mut() {
            *v += b;
        }
    }
}

/// `m[i, j] -= bias[j]` for every row.
#[inline]
pub fn sub_row_bias(m: &mut Matrix, bias: &Vector) {
    for (j, mut col) in m.column_iter_mut().enumerate() {
        let b = bias[j];
        for v in col.iter_mut() {
            *v -= b;
        }
    }
}
