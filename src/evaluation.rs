//! Held-out scoring

use crate::data::Dataset;
use crate::error::{KolosalError, Result};
use crate::pipeline::FittedPipeline;

/// Fraction of exact label matches
pub fn accuracy(y_true: &[i64], y_pred: &[i64]) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(KolosalError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(KolosalError::InvalidInput("cannot score an empty set".to_string()));
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Accuracy of `pipeline` on `test`
pub fn evaluate(pipeline: &FittedPipeline, test: &Dataset) -> Result<f64> {
    if test.is_empty() {
        return Err(KolosalError::InvalidInput("test set is empty".to_string()));
    }
    let predictions = pipeline.predict(&test.features())?;
    accuracy(&test.labels().to_vec(), &predictions.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use crate::estimators::{Criterion, EstimatorSpec};
    use crate::pipeline::PipelineSpec;
    use ndarray::{Array1, Array2};

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[1, 0, 1, 1], &[1, 1, 1, 0]).unwrap(), 0.5);
        assert_eq!(accuracy(&[3], &[3]).unwrap(), 1.0);
    }

    #[test]
    fn test_accuracy_errors() {
        assert!(matches!(accuracy(&[], &[]), Err(KolosalError::InvalidInput(_))));
        assert!(matches!(accuracy(&[1, 0], &[1]), Err(KolosalError::ShapeError { .. })));
    }

    #[test]
    fn test_constant_predictor_scores_majority_share() {
        // A depth-0 tree predicts the training majority everywhere
        let train = Dataset::new(
            Array2::from_shape_fn((10, 1), |(i, _)| i as f32),
            Array1::from(vec![1, 1, 1, 1, 1, 1, 1, 0, 0, 0]),
        )
        .unwrap();
        let spec = PipelineSpec::new(EstimatorSpec::DecisionTree {
            criterion: Criterion::Gini,
            max_depth: 0,
            min_samples_split: 2,
            min_samples_leaf: 1,
        });
        let x = train.features_f64();
        let fitted = spec.fit(x.view(), &train.labels().to_vec(), &CpuBackend::new(), 0).unwrap();

        let test = Dataset::new(Array2::zeros((4, 1)), Array1::from(vec![1, 0, 1, 1])).unwrap();
        assert_eq!(evaluate(&fitted, &test).unwrap(), 0.75);
    }

    #[test]
    fn test_empty_test_set() {
        let train = Dataset::new(Array2::from_shape_fn((4, 1), |(i, _)| i as f32), Array1::from(vec![0, 0, 1, 1])).unwrap();
        let x = train.features_f64();
        let fitted = PipelineSpec::new(EstimatorSpec::GaussianNb { var_smoothing: 1e-9 })
            .fit(x.view(), &train.labels().to_vec(), &CpuBackend::new(), 0)
            .unwrap();
        let empty = Dataset::new(Array2::zeros((0, 1)), Array1::from(Vec::<i64>::new())).unwrap();
        assert!(matches!(evaluate(&fitted, &empty), Err(KolosalError::InvalidInput(_))));
    }
}
