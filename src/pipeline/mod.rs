//! Pipelines: a chain of preprocessors feeding one classifier
//!
//! [`PipelineSpec`] is the serialisable genome a search mutates.
//! [`FittedPipeline`] is what fitting one produces.

use crate::backend::EstimatorBackend;
use crate::error::{KolosalError, Result};
use crate::estimators::{Classifier, EstimatorSpec, Transformer, TransformerSpec};
use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Preprocessors applied in order, then the estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub preprocessors: Vec<TransformerSpec>,
    pub estimator: EstimatorSpec,
}

impl PipelineSpec {
    pub fn new(estimator: EstimatorSpec) -> Self {
        Self { preprocessors: Vec::new(), estimator }
    }

    pub fn with_preprocessor(mut self, step: TransformerSpec) -> Self {
        self.preprocessors.push(step);
        self
    }

    /// Number of operators, estimator included
    pub fn n_steps(&self) -> usize {
        self.preprocessors.len() + 1
    }

    /// Nested operator notation, e.g.
    /// `GaussianNB(StandardScaler(input_matrix), var_smoothing=1e-9)`
    pub fn describe(&self) -> String {
        let inner = self
            .preprocessors
            .iter()
            .fold("input_matrix".to_string(), |acc, step| format!("{}({})", step.name(), acc));

        let mut out = format!("{}({}", self.estimator.name(), inner);
        for (name, value) in self.estimator.params() {
            out.push_str(&format!(", {}={}", name, value));
        }
        out.push(')');
        out
    }

    /// Identity used to cache scores; equal specs have equal keys
    pub fn key(&self) -> String {
        self.describe()
    }

    /// Fit every step on `x`, building the classifier through `backend`
    pub fn fit(
        &self,
        x: ArrayView2<'_, f64>,
        y: &[i64],
        backend: &dyn EstimatorBackend,
        seed: u64,
    ) -> Result<FittedPipeline> {
        let mut transformers = Vec::with_capacity(self.preprocessors.len());
        let mut current = x.to_owned();
        for step in &self.preprocessors {
            let mut transformer = step.build();
            current = transformer.fit_transform(current.view())?;
            transformers.push(transformer);
        }

        let mut classifier = backend.build(&self.estimator, seed)?;
        classifier.fit(current.view(), y)?;

        Ok(FittedPipeline {
            spec: self.clone(),
            transformers,
            classifier,
        })
    }
}

impl fmt::Display for PipelineSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A pipeline with every step fitted
pub struct FittedPipeline {
    spec: PipelineSpec,
    transformers: Vec<Box<dyn Transformer>>,
    classifier: Box<dyn Classifier>,
}

impl fmt::Debug for FittedPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FittedPipeline").field("spec", &self.describe()).finish()
    }
}

impl FittedPipeline {
    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    pub fn describe(&self) -> String {
        self.spec.describe()
    }

    /// Predict labels for `f32` feature rows
    pub fn predict(&self, x: &ArrayView2<'_, f32>) -> Result<Array1<i64>> {
        let widened = x.mapv(f64::from);
        self.predict_f64(widened.view()).map(Array1::from)
    }

    pub(crate) fn predict_f64(&self, x: ArrayView2<'_, f64>) -> Result<Vec<i64>> {
        if self.transformers.is_empty() {
            return self.classifier.predict(x);
        }
        let mut current = x.to_owned();
        for transformer in &self.transformers {
            current = transformer.transform(current.view())?;
        }
        let predictions = self.classifier.predict(current.view())?;
        if predictions.len() != x.nrows() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} predictions", x.nrows()),
                actual: format!("{} predictions", predictions.len()),
            });
        }
        Ok(predictions)
    }
}
