//! Round-trip acceptance check for an exported pipeline.
//!
//! Drives a dense grid of control vectors forward and back through a
//! [`Pipeline`] and measures how far the recovered controls drift from the
//! originals. The check never fails: stage errors are folded into the report
//! as an infinite error so callers only have to interpret a number.

use crate::linalg::{linspace, Matrix};
use crate::pipeline::Pipeline;
use crate::Error;

/// Grid used when no explicit settings are given.
pub const DEFAULT_GRID_STEPS: usize = 10;
pub const DEFAULT_GRID_LOW: f64 = 0.01;
pub const DEFAULT_GRID_HIGH: f64 = 0.99;

/// Row budget for one validation grid. Wider control spaces get fewer
/// values per axis.
pub const MAX_GRID_ROWS: usize = 100_000;

/// Result of a round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTripReport {
    /// Mean over vectors of the per-vector sum of absolute errors.
    pub mean_abs_error: f64,
    /// Largest per-vector sum of absolute errors.
    pub max_abs_error: f64,
    pub samples: usize,
    /// Stage error that aborted the round trip, if any.
    pub failure: Option<Error>,
}

impl RoundTripReport {
    fn failed(samples: usize, error: Error) -> Self {
        tracing::warn!("Round trip aborted: {}", error);
        Self {
            mean_abs_error: f64::INFINITY,
            max_abs_error: f64::INFINITY,
            samples,
            failure: Some(error),
        }
    }

    /// Whether the round trip completed with a finite error.
    pub fn is_finite(&self) -> bool {
        self.failure.is_none() && self.mean_abs_error.is_finite()
    }

    /// Convenience threshold check; interpretation stays with the caller.
    pub fn passes(&self, tolerance: f64) -> bool {
        self.is_finite() && self.mean_abs_error < tolerance
    }
}

/// Control-space grid settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundTripValidator {
    /// Values per axis.
    pub steps: usize,
    pub low: f64,
    pub high: f64,
}

impl Default for RoundTripValidator {
    fn default() -> Self {
        Self {
            steps: DEFAULT_GRID_STEPS,
            low: DEFAULT_GRID_LOW,
            high: DEFAULT_GRID_HIGH,
        }
    }
}

impl RoundTripValidator {
    pub fn new(steps: usize, low: f64, high: f64) -> Self {
        Self { steps, low, high }
    }

    /// Reduce `steps` until a `dims`-wide grid has at most `max_rows` rows
    /// (never below two values per axis).
    pub fn capped(mut self, dims: usize, max_rows: usize) -> Self {
        while self.steps > 2
            && self
                .steps
                .checked_pow(dims as u32)
                .map_or(true, |rows| rows > max_rows)
        {
            self.steps -= 1;
        }
        self
    }

    /// Number of grid rows for `dims` axes, `None` on overflow.
    pub fn rows(&self, dims: usize) -> Option<usize> {
        u32::try_from(dims)
            .ok()
            .and_then(|d| self.steps.checked_pow(d))
    }

    /// Cartesian product of `steps` evenly spaced values per axis; the first
    /// axis varies slowest. `steps^dims` rows, `None` if that overflows.
    pub fn grid(&self, dims: usize) -> Option<Matrix> {
        let axis = linspace(self.low, self.high, self.steps);
        let rows = self.rows(dims)?;
        if dims == 0 || rows == 0 {
            return Some(Matrix::zeros(0, dims));
        }
        Some(Matrix::from_fn(rows, dims, |r, c| {
            // c < dims, so this stride divides `rows` and cannot overflow
            let stride = axis.len().pow((dims - 1 - c) as u32);
            axis[(r / stride) % axis.len()]
        }))
    }

    /// Round-trip the grid sized to the pipeline's control width, capped at
    /// [`MAX_GRID_ROWS`]. A control space too wide for even two values per
    /// axis is reported as a failed round trip.
    pub fn validate(&self, pipeline: &Pipeline) -> RoundTripReport {
        let dims = pipeline.input_width();
        let validator = self.capped(dims, MAX_GRID_ROWS);
        if validator.steps != self.steps {
            tracing::debug!(
                "Validation grid reduced to {} steps for {} dimensions",
                validator.steps,
                dims
            );
        }
        match validator.rows(dims) {
            Some(rows) if rows <= MAX_GRID_ROWS => {}
            rows => {
                return RoundTripReport::failed(
                    0,
                    Error::GridTooLarge {
                        dims,
                        steps: validator.steps,
                        rows,
                    },
                )
            }
        }
        match validator.grid(dims) {
            Some(controls) => round_trip(pipeline, &controls),
            None => RoundTripReport::failed(
                0,
                Error::GridTooLarge {
                    dims,
                    steps: validator.steps,
                    rows: None,
                },
            ),
        }
    }
}

/// Round-trip an arbitrary control batch.
pub fn round_trip(pipeline: &Pipeline, controls: &Matrix) -> RoundTripReport {
    let samples = controls.nrows();
    let recovered = match pipeline
        .forward(controls)
        .and_then(|latent| pipeline.backward(&latent))
    {
        Ok(recovered) => recovered,
        Err(e) => return RoundTripReport::failed(samples, e),
    };

    let per_vector: Vec<f64> = (controls - &recovered)
        .row_iter()
        .map(|row| row.iter().map(|v| v.abs()).sum())
        .collect();
    let mean_abs_error = per_vector.iter().sum::<f64>() / samples as f64;
    // f64::max drops NaN; keep it so a NaN row cannot look finite.
    let max_abs_error = per_vector.iter().copied().fold(0.0, |acc: f64, v| {
        if acc.is_nan() || v.is_nan() {
            f64::NAN
        } else {
            acc.max(v)
        }
    });

    tracing::debug!(
        "Round trip over {} vectors: mean {:.3e}, max {:.3e}",
        samples,
        mean_abs_error,
        max_abs_error
    );

    RoundTripReport {
        mean_abs_error,
        max_abs_error,
        samples,
        failure: None,
    }
}
