//! Principal-component change of basis.

use crate::linalg::{add_row_bias, check_width, invert, sub_row_bias, InversionMethod, Matrix, Vector};
use crate::{Error, Result};

/// Change of basis between PCA coordinates and the original latent basis.
///
/// `weight` holds the principal directions as columns (`d x k`). Forward
/// decodes PCA coordinates back into the latent basis, matching the
/// control -> latent direction of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisChange {
    weight: Matrix,
    weight_inv: Matrix,
    bias: Vector,
}

impl BasisChange {
    pub const NAME: &'static str = "basis_change";

    /// Build from stored parameters. `weight_inv` was computed at export time.
    pub fn new(weight: Matrix, weight_inv: Matrix, bias: Vector) -> Result<Self> {
        if weight.is_empty() {
            return Err(Error::InvalidStage(format!("{}: empty weight", Self::NAME)));
        }
        if weight_inv.shape() != (weight.ncols(), weight.nrows()) {
            return Err(Error::InvalidStage(format!(
                "{}: weights_inv is {:?}, expected {:?}",
                Self::NAME,
                weight_inv.shape(),
                (weight.ncols(), weight.nrows())
            )));
        }
        if bias.len() != weight.nrows() {
            return Err(Error::DimensionMismatch {
                stage: Self::NAME,
                expected: weight.nrows(),
                actual: bias.len(),
            });
        }
        Ok(Self {
            weight,
            weight_inv,
            bias,
        })
    }

    /// Build from freshly fitted basis vectors, inverting once.
    pub fn from_basis(weight: Matrix, bias: Vector) -> Result<(Self, InversionMethod)> {
        let (weight_inv, method) = invert(&weight)?;
        Ok((Self::new(weight, weight_inv, bias)?, method))
    }

    pub fn weight(&self) -> &Matrix {
        &self.weight
    }

    pub fn weight_inv(&self) -> &Matrix {
        &self.weight_inv
    }

    pub fn bias(&self) -> &Vector {
        &self.bias
    }

    /// Width of PCA coordinates.
    pub fn input_width(&self) -> usize {
        self.weight_inv.nrows()
    }

    /// Width of the original latent basis.
    pub fn output_width(&self) -> usize {
        self.weight_inv.ncols()
    }

    /// `x · weight_inv + bias`
    pub fn forward(&self, x: &Matrix) -> Result<Matrix> {
        check_width(Self::NAME, x, self.input_width())?;
        let mut out = x * &self.weight_inv;
        add_row_bias(&mut out, &self.bias);
        Ok(out)
    }

    /// `(z - bias) · weight`
    pub fn backward(&self, z: &Matrix) -> Result<Matrix> {
        check_width(Self::NAME, z, self.output_width())?;
        let mut centered = z.clone();
        sub_row_bias(&mut centered, &self.bias);
        Ok(centered * &self.weight)
    }
}
