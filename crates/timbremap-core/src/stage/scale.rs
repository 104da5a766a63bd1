//! Per-dimension scale stages mapping control space into latent range.

use crate::linalg::{check_width, Matrix, Vector};
use crate::special::{erf, erfinv};
use crate::{Error, Result};
use std::f64::consts::SQRT_2;

/// Probabilities are clamped to `(PROBIT_EPSILON, 1 - PROBIT_EPSILON)`
/// before the probit transform.
pub const PROBIT_EPSILON: f64 = 1e-9;

fn check_params(stage: &'static str, a: &Vector, b: &Vector) -> Result<()> {
    if a.is_empty() {
        return Err(Error::InvalidStage(format!("{}: no dimensions", stage)));
    }
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            stage,
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// Uniform range mapping: `x * range + min`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorScale {
    bias: Vector,
    scale: Vector,
}

impl VectorScale {
    pub const NAME: &'static str = "vector_scale";

    /// `min` and `range` are the per-dimension minimum and `max - min` of the
    /// reference latent samples.
    pub fn new(min: Vector, range: Vector) -> Result<Self> {
        check_params(Self::NAME, &min, &range)?;
        Ok(Self {
            bias: min,
            scale: range,
        })
    }

    pub fn min(&self) -> &Vector {
        &self.bias
    }

    pub fn range(&self) -> &Vector {
        &self.scale
    }

    pub fn width(&self) -> usize {
        self.bias.len()
    }

    /// First dimension with zero range, if any.
    pub fn degenerate_dim(&self) -> Option<usize> {
        self.scale.iter().position(|&s| s == 0.0)
    }

    pub fn forward(&self, x: &Matrix) -> Result<Matrix> {
        check_width(Self::NAME, x, self.width())?;
        let mut out = x.clone();
        for (j, mut col) in out.column_iter_mut().enumerate() {
            let (s, b) = (self.scale[j], self.bias[j]);
            for v in col.iter_mut() {
                *v = *v * s + b;
            }
        }
        Ok(out)
    }

    pub fn backward(&self, z: &Matrix) -> Result<Matrix> {
        check_width(Self::NAME, z, self.width())?;
        if let Some(dim) = self.degenerate_dim() {
            return Err(Error::DegenerateScale {
                stage: Self::NAME,
                dim,
            });
        }
        let mut out = z.clone();
        for (j, mut col) in out.column_iter_mut().enumerate() {
            let (s, b) = (self.scale[j], self.bias[j]);
            for v in col.iter_mut() {
                *v = (*v - b) / s;
            }
        }
        Ok(out)
    }
}

/// Probit mapping under a per-dimension Normal model.
///
/// Forward treats each control value as a cumulative probability and returns
/// the matching latent value; backward is the Normal CDF.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianScale {
    mean: Vector,
    std: Vector,
}

impl GaussianScale {
    pub const NAME: &'static str = "gaussian_scale";

    pub fn new(mean: Vector, std: Vector) -> Result<Self> {
        check_params(Self::NAME, &mean, &std)?;
        Ok(Self { mean, std })
    }

    pub fn mean(&self) -> &Vector {
        &self.mean
    }

    pub fn std(&self) -> &Vector {
        &self.std
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn forward(&self, x: &Matrix) -> Result<Matrix> {
        check_width(Self::NAME, x, self.width())?;
        let mut out = x.clone();
        for (j, mut col) in out.column_iter_mut().enumerate() {
            let (mu, sigma) = (self.mean[j], self.std[j]);
            for v in col.iter_mut() {
                if !(*v > 0.0 && *v < 1.0) {
                    return Err(Error::Domain {
                        function: Self::NAME,
                        value: *v,
                    });
                }
                let p = (*v).clamp(PROBIT_EPSILON, 1.0 - PROBIT_EPSILON);
                *v = mu + sigma * SQRT_2 * erfinv(2.0 * p - 1.0)?;
            }
        }
        Ok(out)
    }

    pub fn backward(&self, z: &Matrix) -> Result<Matrix> {
        check_width(Self::NAME, z, self.width())?;
        if let Some(dim) = self.std.iter().position(|&s| s == 0.0) {
            return Err(Error::DegenerateScale {
                stage: Self::NAME,
                dim,
            });
        }
        let mut out = z.clone();
        for (j, mut col) in out.column_iter_mut().enumerate() {
            let (mu, sigma) = (self.mean[j], self.std[j]);
            for v in col.iter_mut() {
                *v = 0.5 * (1.0 + erf((*v - mu) / (sigma * SQRT_2)));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::from_row_major;
    use approx::assert_abs_diff_eq;

    fn v(values: &[f64]) -> Vector {
        Vector::from_row_slice(values)
    }

    #[test]
    fn test_vector_scale_forward() {
        let stage = VectorScale::new(v(&[-1.0, 10.0]), v(&[2.0, 5.0])).unwrap();
        let x = from_row_major(2, 2, &[0.0, 0.0, 1.0, 0.5]).unwrap();
        let z = stage.forward(&x).unwrap();
        assert_eq!(z[(0, 0)], -1.0);
        assert_eq!(z[(0, 1)], 10.0);
        assert_eq!(z[(1, 0)], 1.0);
        assert_eq!(z[(1, 1)], 12.5);
    }

    #[test]
    fn test_vector_scale_round_trip() {
        let stage = VectorScale::new(v(&[-1.0, 10.0, 0.3]), v(&[2.0, 5.0, 0.01])).unwrap();
        let x = from_row_major(2, 3, &[0.1, 0.2, 0.3, 0.9, 0.5, 0.01]).unwrap();
        let back = stage.backward(&stage.forward(&x).unwrap()).unwrap();
        for (a, b) in x.iter().zip(back.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_vector_scale_zero_range_is_reported() {
        let stage = VectorScale::new(v(&[0.0, 0.0]), v(&[1.0, 0.0])).unwrap();
        let x = from_row_major(1, 2, &[0.5, 0.5]).unwrap();
        // Forward is well defined; backward would divide by zero.
        let z = stage.forward(&x).unwrap();
        assert_eq!(
            stage.backward(&z),
            Err(Error::DegenerateScale {
                stage: VectorScale::NAME,
                dim: 1
            })
        );
    }

    #[test]
    fn test_vector_scale_rejects_mismatched_params() {
        assert!(VectorScale::new(v(&[0.0, 0.0]), v(&[1.0])).is_err());
        assert!(VectorScale::new(v(&[]), v(&[])).is_err());
    }

    #[test]
    fn test_vector_scale_width_mismatch() {
        let stage = VectorScale::new(v(&[0.0, 0.0]), v(&[1.0, 1.0])).unwrap();
        let x = from_row_major(1, 3, &[0.1, 0.2, 0.3]).unwrap();
        assert!(matches!(
            stage.forward(&x),
            Err(Error::DimensionMismatch { expected: 2, actual: 3, .. })
        ));
    }

    #[test]
    fn test_gaussian_scale_median_maps_to_mean() {
        let stage = GaussianScale::new(v(&[3.0, -2.0]), v(&[0.5, 4.0])).unwrap();
        let x = from_row_major(1, 2, &[0.5, 0.5]).unwrap();
        let z = stage.forward(&x).unwrap();
        assert_abs_diff_eq!(z[(0, 0)], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(z[(0, 1)], -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gaussian_scale_round_trip() {
        let stage = GaussianScale::new(v(&[0.2, -1.5, 7.0]), v(&[1.0, 0.3, 2.5])).unwrap();
        let x = from_row_major(3, 3, &[0.01, 0.5, 0.99, 0.25, 0.75, 0.1, 0.9, 0.33, 0.66])
            .unwrap();
        let back = stage.backward(&stage.forward(&x).unwrap()).unwrap();
        for (a, b) in x.iter().zip(back.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_gaussian_scale_domain() {
        let stage = GaussianScale::new(v(&[0.0]), v(&[1.0])).unwrap();
        for bad in [0.0, 1.0, -0.2, 1.3, f64::NAN] {
            let x = from_row_major(1, 1, &[bad]).unwrap();
            assert!(matches!(
                stage.forward(&x),
                Err(Error::Domain {
                    function: GaussianScale::NAME,
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_gaussian_scale_clamps_near_bounds() {
        let stage = GaussianScale::new(v(&[0.0]), v(&[1.0])).unwrap();
        let x = from_row_major(1, 1, &[1e-300]).unwrap();
        let z = stage.forward(&x).unwrap();
        assert!(z[(0, 0)].is_finite());
        assert!(z[(0, 0)] < -5.0);
    }

    #[test]
    fn test_gaussian_scale_zero_std_is_reported() {
        let stage = GaussianScale::new(v(&[0.0, 1.0]), v(&[0.0, 1.0])).unwrap();
        let z = from_row_major(1, 2, &[0.0, 1.0]).unwrap();
        assert!(matches!(
            stage.backward(&z),
            Err(Error::DegenerateScale { dim: 0, .. })
        ));
    }
}
