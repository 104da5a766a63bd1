//! Closed-form error function approximations.
//!
//! Winitzki's "handy approximation" of erf and its inverse. The inverse is
//! the exact algebraic inverse of the forward formula, so the two compose to
//! the identity up to floating-point error everywhere except very close to
//! `±1`, where `ln((1-x)(1+x))` loses precision.
//!
//! No iterative refinement is performed; these are cheap enough to run per
//! element on the host runtime's hot path.

use crate::{Error, Result};
use std::f64::consts::PI;

/// Shape constant of the approximation.
pub const ERF_B: f64 = 0.147;

/// `4 / π`.
pub const ERF_A: f64 = 4.0 / PI;

#[inline]
fn sign(x: f64) -> f64 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Approximate error function.
///
/// `erf(x) = sign(x) * sqrt(1 - exp(-x² (a + b x²) / (1 + b x²)))`
#[inline]
pub fn erf(x: f64) -> f64 {
    let xx = x * x;
    let bxx = ERF_B * xx;
    sign(x) * (1.0 - (-xx * (ERF_A + bxx) / (1.0 + bxx)).exp()).sqrt()
}

/// Approximate inverse error function.
///
/// Defined on the open interval `(-1, 1)`; `±1`, anything outside and `NaN`
/// fail with [`Error::Domain`].
#[inline]
pub fn erfinv(x: f64) -> Result<f64> {
    if !(x > -1.0 && x < 1.0) {
        return Err(Error::Domain {
            function: "erfinv",
            value: x,
        });
    }

    let ln = ((1.0 - x) * (1.0 + x)).ln();
    let t1 = 2.0 / (PI * ERF_B) + 0.5 * ln;
    let t2 = ln / ERF_B;
    Ok(sign(x) * (-t1 + (t1 * t1 - t2).sqrt()).sqrt())
}

/// Normal CDF with the given location and scale.
#[inline]
pub fn norm_cdf(x: f64, mean: f64, std: f64) -> f64 {
    0.5 * (1.0 + erf((x - mean) / (std * std::f64::consts::SQRT_2)))
}

/// Normal quantile (probit) with the given location and scale.
///
/// `p` must lie strictly inside `(0, 1)`.
#[inline]
pub fn norm_ppf(p: f64, mean: f64, std: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(Error::Domain {
            function: "norm_ppf",
            value: p,
        });
    }
    Ok(mean + std * std::f64::consts::SQRT_2 * erfinv(2.0 * p - 1.0)?)
}
