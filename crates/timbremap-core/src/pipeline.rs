//! Ordered composition of stages.
//!
//! Layout is fixed: one scale stage, an optional basis change, then zero or
//! more dense stages. Forward walks the stages in order; backward walks them
//! in exactly the reverse order.

use crate::linalg::{from_row_major, Matrix};
use crate::stage::{BasisChange, DenseAffine, GaussianScale, Stage, StageKind, VectorScale};
use crate::{Error, Result};

/// Immutable inference chain. Owns all stage data.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Validate stage order and width chaining.
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        let Some(first) = stages.first() else {
            return Err(Error::InvalidStage("pipeline has no stages".into()));
        };
        if !first.kind().is_scale() {
            return Err(Error::InvalidStage(format!(
                "pipeline must start with a scale stage, found {}",
                first.kind()
            )));
        }

        let mut seen_dense = false;
        for (idx, stage) in stages.iter().enumerate().skip(1) {
            match stage.kind() {
                StageKind::VectorScale | StageKind::GaussianScale => {
                    return Err(Error::InvalidStage(format!(
                        "scale stage at position {} (only position 0 allowed)",
                        idx
                    )));
                }
                StageKind::BasisChange if idx != 1 || seen_dense => {
                    return Err(Error::InvalidStage(format!(
                        "basis change at position {} (only directly after the scale stage)",
                        idx
                    )));
                }
                StageKind::BasisChange => {}
                StageKind::DenseAffine => seen_dense = true,
            }
        }

        for pair in stages.windows(2) {
            if pair[0].output_width() != pair[1].input_width() {
                return Err(Error::DimensionMismatch {
                    stage: "pipeline",
                    expected: pair[0].output_width(),
                    actual: pair[1].input_width(),
                });
            }
        }

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Width of a control vector.
    pub fn input_width(&self) -> usize {
        self.stages[0].input_width()
    }

    /// Width of the predicted output vector.
    pub fn output_width(&self) -> usize {
        self.stages[self.stages.len() - 1].output_width()
    }

    pub fn scale_kind(&self) -> StageKind {
        self.stages[0].kind()
    }

    pub fn has_basis_change(&self) -> bool {
        self.stages
            .iter()
            .any(|s| s.kind() == StageKind::BasisChange)
    }

    pub fn dense_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.kind() == StageKind::DenseAffine)
            .count()
    }

    /// Control batch -> output batch.
    pub fn forward(&self, batch: &Matrix) -> Result<Matrix> {
        let mut patch = batch.clone();
        for stage in &self.stages {
            patch = stage.forward(&patch)?;
        }
        Ok(patch)
    }

    /// Observed output batch -> recovered control batch.
    pub fn backward(&self, batch: &Matrix) -> Result<Matrix> {
        let mut patch = batch.clone();
        for stage in self.stages.iter().rev() {
            patch = stage.backward(&patch)?;
        }
        Ok(patch)
    }

    /// Forward a single control vector.
    pub fn forward_one(&self, control: &[f64]) -> Result<Vec<f64>> {
        let batch = from_row_major(1, control.len(), control)?;
        Ok(self.forward(&batch)?.iter().copied().collect())
    }

    /// Backward a single observed vector.
    pub fn backward_one(&self, observed: &[f64]) -> Result<Vec<f64>> {
        let batch = from_row_major(1, observed.len(), observed)?;
        Ok(self.backward(&batch)?.iter().copied().collect())
    }
}

/// Assembles a [`Pipeline`] in the fixed stage order.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    scale: Option<Stage>,
    basis: Option<BasisChange>,
    dense: Vec<DenseAffine>,
}

impl PipelineBuilder {
    pub fn vector_scale(mut self, stage: VectorScale) -> Self {
        self.scale = Some(stage.into());
        self
    }

    pub fn gaussian_scale(mut self, stage: GaussianScale) -> Self {
        self.scale = Some(stage.into());
        self
    }

    pub fn basis_change(mut self, stage: BasisChange) -> Self {
        self.basis = Some(stage);
        self
    }

    /// Appended in declaration order.
    pub fn dense(mut self, stage: DenseAffine) -> Self {
        self.dense.push(stage);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let scale = self
            .scale
            .ok_or_else(|| Error::InvalidStage("pipeline needs a scale stage".into()))?;
        let mut stages = Vec::with_capacity(2 + self.dense.len());
        stages.push(scale);
        if let Some(basis) = self.basis {
            stages.push(basis.into());
        }
        stages.extend(self.dense.into_iter().map(Stage::from));
        Pipeline::new(stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;
    use crate::linalg::Vector;
    use approx::assert_abs_diff_eq;

    fn unit_scale() -> VectorScale {
        VectorScale::new(Vector::zeros(3), Vector::from_element(3, 1.0)).unwrap()
    }

    fn dense(scale: f64, act: Activation) -> DenseAffine {
        DenseAffine::from_trained(Matrix::identity(3, 3) * scale, Vector::zeros(3), act)
            .unwrap()
            .0
    }

    #[test]
    fn test_builder_orders_stages() {
        let (basis, _) =
            BasisChange::from_basis(Matrix::identity(3, 3), Vector::zeros(3)).unwrap();
        let pipeline = Pipeline::builder()
            .dense(dense(2.0, Activation::Linear))
            .basis_change(basis)
            .vector_scale(unit_scale())
            .dense(dense(0.5, Activation::Tanh))
            .build()
            .unwrap();

        let kinds: Vec<_> = pipeline.stages().iter().map(Stage::kind).collect();
        assert_eq!(
            kinds,
            vec![
                StageKind::VectorScale,
                StageKind::BasisChange,
                StageKind::DenseAffine,
                StageKind::DenseAffine
            ]
        );
        assert!(pipeline.has_basis_change());
        assert_eq!(pipeline.dense_count(), 2);
        assert_eq!(pipeline.input_width(), 3);
        assert_eq!(pipeline.output_width(), 3);
    }

    #[test]
    fn test_builder_requires_scale() {
        assert!(Pipeline::builder()
            .dense(dense(1.0, Activation::Linear))
            .build()
            .is_err());
    }

    #[test]
    fn test_new_rejects_bad_order() {
        let scale: Stage = unit_scale().into();
        let d: Stage = dense(1.0, Activation::Linear).into();
        let (basis, _) =
            BasisChange::from_basis(Matrix::identity(3, 3), Vector::zeros(3)).unwrap();
        let basis: Stage = basis.into();

        assert!(Pipeline::new(vec![]).is_err());
        assert!(Pipeline::new(vec![d.clone(), scale.clone()]).is_err());
        assert!(Pipeline::new(vec![scale.clone(), scale.clone()]).is_err());
        assert!(Pipeline::new(vec![scale.clone(), d.clone(), basis.clone()]).is_err());
        assert!(Pipeline::new(vec![scale, basis, d]).is_ok());
    }

    #[test]
    fn test_new_rejects_width_gap() {
        let scale: Stage = unit_scale().into();
        let wide = DenseAffine::from_trained(Matrix::identity(4, 4), Vector::zeros(4), Activation::Linear)
            .unwrap()
            .0;
        assert!(matches!(
            Pipeline::new(vec![scale, wide.into()]),
            Err(Error::DimensionMismatch { expected: 3, actual: 4, .. })
        ));
    }

    #[test]
    fn test_forward_then_backward_order() {
        // Non-commuting stages: scale by 2 then add 1 versus the reverse.
        let scale = VectorScale::new(Vector::from_element(3, 1.0), Vector::from_element(3, 2.0))
            .unwrap();
        let d = DenseAffine::from_trained(
            Matrix::identity(3, 3) * 3.0,
            Vector::from_element(3, -1.0),
            Activation::Linear,
        )
        .unwrap()
        .0;
        let pipeline = Pipeline::builder().vector_scale(scale).dense(d).build().unwrap();

        let y = pipeline.forward_one(&[0.5, 0.0, 1.0]).unwrap();
        // (0.5 * 2 + 1) * 3 - 1 = 5
        assert_abs_diff_eq!(y[0], 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y[2], 8.0, epsilon = 1e-12);

        let c = pipeline.backward_one(&y).unwrap();
        assert_abs_diff_eq!(c[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(c[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_scale_only_pipeline() {
        let pipeline = Pipeline::builder().vector_scale(unit_scale()).build().unwrap();
        assert_eq!(pipeline.dense_count(), 0);
        assert!(!pipeline.has_basis_change());
        assert_eq!(pipeline.forward_one(&[0.1, 0.2, 0.3]).unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_errors_propagate_from_stages() {
        let gauss = GaussianScale::new(Vector::zeros(3), Vector::from_element(3, 1.0)).unwrap();
        let pipeline = Pipeline::builder().gaussian_scale(gauss).build().unwrap();
        assert_eq!(pipeline.scale_kind(), StageKind::GaussianScale);
        assert!(matches!(
            pipeline.forward_one(&[0.5, 1.0, 0.5]),
            Err(Error::Domain { .. })
        ));
        assert!(pipeline.forward_one(&[0.5, 0.5]).is_err());
    }
}
