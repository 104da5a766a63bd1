//! Dense affine stage with an invertible activation.

use crate::activation::Activation;
use crate::linalg::{add_row_bias, check_width, invert, sub_row_bias, InversionMethod, Matrix, Vector};
use crate::{Error, Result};

/// `y = activation(x · weight + bias)`, inverted as
/// `x = (activation⁻¹(y) - bias) · weight_inv`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseAffine {
    weight: Matrix,
    bias: Vector,
    weight_inv: Matrix,
    activation: Activation,
}

impl DenseAffine {
    pub const NAME: &'static str = "dense_affine";

    /// Build from stored parameters. `weight` is `in x out`, `weight_inv`
    /// is `out x in`.
    pub fn new(
        weight: Matrix,
        bias: Vector,
        weight_inv: Matrix,
        activation: Activation,
    ) -> Result<Self> {
        if weight.is_empty() {
            return Err(Error::InvalidStage(format!("{}: empty weight", Self::NAME)));
        }
        if bias.len() != weight.ncols() {
            return Err(Error::DimensionMismatch {
                stage: Self::NAME,
                expected: weight.ncols(),
                actual: bias.len(),
            });
        }
        if weight_inv.shape() != (weight.ncols(), weight.nrows()) {
            return Err(Error::InvalidStage(format!(
                "{}: weights_inv is {:?}, expected {:?}",
                Self::NAME,
                weight_inv.shape(),
                (weight.ncols(), weight.nrows())
            )));
        }
        Ok(Self {
            weight,
            bias,
            weight_inv,
            activation,
        })
    }

    /// Build from a trained layer, computing the inverse once.
    pub fn from_trained(
        weight: Matrix,
        bias: Vector,
        activation: Activation,
    ) -> Result<(Self, InversionMethod)> {
        let (weight_inv, method) = invert(&weight)?;
        if method == InversionMethod::Pseudo {
            tracing::warn!(
                "Dense weight {}x{} is not invertible, using pseudo-inverse",
                weight.nrows(),
                weight.ncols()
            );
        }
        Ok((Self::new(weight, bias, weight_inv, activation)?, method))
    }

    pub fn weight(&self) -> &Matrix {
        &self.weight
    }

    pub fn bias(&self) -> &Vector {
        &self.bias
    }

    pub fn weight_inv(&self) -> &Matrix {
        &self.weight_inv
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn input_width(&self) -> usize {
        self.weight.nrows()
    }

    pub fn output_width(&self) -> usize {
        self.weight.ncols()
    }

    pub fn forward(&self, x: &Matrix) -> Result<Matrix> {
        check_width(Self::NAME, x, self.input_width())?;
        let mut out = x * &self.weight;
        add_row_bias(&mut out, &self.bias);
        let act = self.activation;
        Ok(out.map(|v| act.apply(v)))
    }

    pub fn backward(&self, y: &Matrix) -> Result<Matrix> {
        check_width(Self::NAME, y, self.output_width())?;
        let act = self.activation;
        let mut pre = y.map(|v| act.invert(v));
        sub_row_bias(&mut pre, &self.bias);
        Ok(pre * &self.weight_inv)
    }
}
