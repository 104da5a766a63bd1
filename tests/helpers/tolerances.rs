//! Tolerance constants for round-trip testing.
//!
//! Different stages lose different amounts of precision.

/// Pure affine chains with exact inverses (identity, scale, linear layers).
pub const AFFINE_EPSILON: f64 = 1e-9;

/// Per-stage bound for affine stages, including pseudo-inverses of
/// well-conditioned matrices.
pub const STAGE_EPSILON: f64 = 1e-6;

/// erf/erfinv-based stages (Gaussian scale).
pub const ERF_EPSILON: f64 = 1e-3;

/// Saturating activations near their asymptotes (sigmoid with epsilon).
pub const SATURATION_EPSILON: f64 = 1e-2;
