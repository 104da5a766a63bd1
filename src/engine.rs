//! TimbreMap: a loaded inference chain with its round-trip check.

use crate::builder::TimbreMapBuilder;
use crate::Result;
use timbremap_core::linalg::batch_from_rows;
use timbremap_core::{Matrix, Pipeline, RoundTripReport, RoundTripValidator, StageKind};
use timbremap_export::PipelineConfig;

/// Control space to output space and back.
///
/// Immutable once built, so it can be shared across threads freely.
///
/// # Example
///
/// ```ignore
/// use timbremap::prelude::*;
///
/// let map = TimbreMap::builder().root("model/").build()?;
///
/// let report = map.validate();
/// assert!(report.passes(1e-2));
///
/// let output = map.forward_one(&[0.1, 0.5, 0.9])?;
/// ```
#[derive(Debug, Clone)]
pub struct TimbreMap {
    pipeline: Pipeline,
    /// Where the pipeline was loaded from (absent for in-memory pipelines).
    source: Option<PipelineConfig>,
    validator: RoundTripValidator,
}

impl TimbreMap {
    pub fn builder() -> TimbreMapBuilder {
        TimbreMapBuilder::default()
    }

    /// Wrap an in-memory pipeline.
    pub fn from_pipeline(pipeline: Pipeline) -> Self {
        Self::from_parts(pipeline, None, RoundTripValidator::default())
    }

    pub(crate) fn from_parts(
        pipeline: Pipeline,
        source: Option<PipelineConfig>,
        validator: RoundTripValidator,
    ) -> Self {
        Self {
            pipeline,
            source,
            validator,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn source(&self) -> Option<&PipelineConfig> {
        self.source.as_ref()
    }

    pub fn validator(&self) -> &RoundTripValidator {
        &self.validator
    }

    pub fn control_width(&self) -> usize {
        self.pipeline.input_width()
    }

    pub fn output_width(&self) -> usize {
        self.pipeline.output_width()
    }

    pub fn scale_kind(&self) -> StageKind {
        self.pipeline.scale_kind()
    }

    /// Control batch (one vector per row) to output batch.
    pub fn forward(&self, controls: &Matrix) -> Result<Matrix> {
        Ok(self.pipeline.forward(controls)?)
    }

    /// Output batch back to control batch.
    pub fn backward(&self, outputs: &Matrix) -> Result<Matrix> {
        Ok(self.pipeline.backward(outputs)?)
    }

    pub fn forward_one(&self, control: &[f64]) -> Result<Vec<f64>> {
        Ok(self.pipeline.forward_one(control)?)
    }

    pub fn backward_one(&self, output: &[f64]) -> Result<Vec<f64>> {
        Ok(self.pipeline.backward_one(output)?)
    }

    /// Forward a list of control vectors.
    pub fn forward_rows(&self, controls: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let out = self.forward(&batch_from_rows(controls)?)?;
        Ok(rows_of(&out))
    }

    /// Backward a list of observed output vectors.
    pub fn backward_rows(&self, outputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let out = self.backward(&batch_from_rows(outputs)?)?;
        Ok(rows_of(&out))
    }

    /// Round-trip the configured control grid. Never fails; stage errors
    /// show up as an infinite error in the report.
    pub fn validate(&self) -> RoundTripReport {
        self.validator.validate(&self.pipeline)
    }
}

fn rows_of(m: &Matrix) -> Vec<Vec<f64>> {
    m.row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}
