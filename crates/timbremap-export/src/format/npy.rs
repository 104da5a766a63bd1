//! NumPy `.npy` siblings using npyz
//!
//! Writes little-endian `<f8` in C order. Reads `f8` and `f4` arrays of
//! either byte order, and Fortran-ordered arrays, which NumPy produces when
//! saving a transposed view.

use super::RawArray;
use crate::error::{Result, StoreError};
use npyz::{DType, NpyFile, Order, WriteOptions, WriterBuilder};
use std::fs;
use std::path::Path;

fn npy_err(path: &Path, reason: impl Into<String>) -> StoreError {
    StoreError::Npy {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Encode `data` (row-major) with the given shape.
pub fn encode(shape: &[usize], data: &[f64]) -> Result<Vec<u8>> {
    let expected = element_count(shape);
    if expected != Some(data.len()) {
        return Err(StoreError::Shape {
            path: Default::default(),
            reason: format!("shape {:?} does not hold {} values", shape, data.len()),
        });
    }

    let dims: Vec<u64> = shape.iter().map(|&d| d as u64).collect();
    let mut out = Vec::with_capacity(128 + data.len() * 8);
    let mut writer = WriteOptions::new()
        .default_dtype()
        .shape(&dims)
        .writer(&mut out)
        .begin_nd()?;
    for v in data {
        writer.push(v)?;
    }
    writer.finish()?;
    Ok(out)
}

fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Fortran-ordered data back to row-major.
fn to_c_order(shape: &[usize], data: &[f64]) -> Vec<f64> {
    match shape {
        [rows, cols] => {
            let mut out = vec![0.0; data.len()];
            for r in 0..*rows {
                for c in 0..*cols {
                    out[r * cols + c] = data[c * rows + r];
                }
            }
            out
        }
        _ => data.to_vec(),
    }
}

pub fn decode(path: &Path, bytes: &[u8]) -> Result<RawArray> {
    let npy = NpyFile::new(bytes).map_err(|e| npy_err(path, e.to_string()))?;

    let shape = npy
        .shape()
        .iter()
        .map(|&d| {
            usize::try_from(d).map_err(|_| npy_err(path, format!("dimension {} too large", d)))
        })
        .collect::<Result<Vec<usize>>>()?;
    let count = element_count(&shape)
        .ok_or_else(|| npy_err(path, format!("shape {:?} overflows", shape)))?;
    let fortran = matches!(npy.order(), Order::Fortran);

    let descr = match npy.dtype() {
        DType::Plain(ts) => ts.to_string(),
        other => return Err(npy_err(path, format!("unsupported dtype {:?}", other))),
    };
    // f4 comes from float32 Keras weights saved as-is.
    let values = if descr.ends_with("f8") {
        npy.into_vec::<f64>()
    } else if descr.ends_with("f4") {
        npy.into_vec::<f32>()
            .map(|v| v.into_iter().map(f64::from).collect())
    } else {
        return Err(npy_err(
            path,
            format!("dtype {} not supported (expected f8 or f4)", descr),
        ));
    };
    let mut data: Vec<f64> = values.map_err(|e| npy_err(path, e.to_string()))?;

    if data.len() != count {
        return Err(npy_err(
            path,
            format!("shape {:?} needs {} values, file has {}", shape, count, data.len()),
        ));
    }
    if fortran {
        data = to_c_order(&shape, &data);
    }

    Ok(RawArray {
        shape: Some(shape),
        data,
    })
}

pub fn write(path: &Path, shape: &[usize], data: &[f64]) -> Result<()> {
    let bytes = encode(shape, data).map_err(|e| match e {
        StoreError::Shape { reason, .. } => StoreError::Shape {
            path: path.to_path_buf(),
            reason,
        },
        other => other,
    })?;
    fs::write(path, bytes)?;
    tracing::debug!("Wrote {:?} array to {}", shape, path.display());
    Ok(())
}

pub fn read(path: &Path) -> Result<RawArray> {
    let bytes = fs::read(path)?;
    let raw = decode(path, &bytes)?;
    tracing::debug!("Read {:?} array from {}", raw.shape, path.display());
    Ok(raw)
}
