//! Dataset samples: loading, splitting and synthetic generation
//!
//! A [`Dataset`] pairs an `f32` feature matrix with one integer label per
//! row. Everything downstream (split, search, evaluation) consumes this
//! type, so the row-count invariant is checked once, at construction.

pub mod loader;
pub mod split;
pub mod synthetic;

pub use loader::{DataSaver, SampleLoader, load_sample};
pub use split::{StratifiedSplitter, TrainTestSplit, train_test_split};
pub use synthetic::{SyntheticConfig, make_classification};

use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::collections::BTreeMap;

/// Feature matrix plus label vector with matching row counts
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Array2<f32>,
    labels: Array1<i64>,
}

impl Dataset {
    /// Create a dataset, rejecting mismatched row counts
    pub fn new(features: Array2<f32>, labels: Array1<i64>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} labels", features.nrows()),
                actual: format!("{} labels", labels.len()),
            });
        }
        Ok(Self { features, labels })
    }

    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    pub fn labels(&self) -> ArrayView1<'_, i64> {
        self.labels.view()
    }

    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of rows per label, ordered by label
    pub fn class_counts(&self) -> BTreeMap<i64, usize> {
        let mut counts = BTreeMap::new();
        for &label in self.labels.iter() {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }

    /// Label with the most rows (ties go to the smaller label)
    pub fn majority_label(&self) -> Option<i64> {
        self.class_counts()
            .into_iter()
            .fold(None, |best: Option<(i64, usize)>, (label, count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((label, count)),
            })
            .map(|(label, _)| label)
    }

    /// Copy the given rows, in the given order, into a new dataset
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }

    /// Features widened to `f64` for the native estimators
    pub fn features_f64(&self) -> Array2<f64> {
        self.features.mapv(f64::from)
    }

    pub fn into_parts(self) -> (Array2<f32>, Array1<i64>) {
        (self.features, self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_new_rejects_mismatched_rows() {
        let features = Array2::<f32>::zeros((3, 2));
        let labels = array![0, 1];
        let err = Dataset::new(features, labels).unwrap_err();
        assert!(matches!(err, KolosalError::ShapeError { .. }));
    }

    #[test]
    fn test_class_counts_and_majority() {
        let features = Array2::<f32>::zeros((5, 1));
        let dataset = Dataset::new(features, array![1, 0, 1, 1, 0]).unwrap();

        let counts = dataset.class_counts();
        assert_eq!(counts[&0], 2);
        assert_eq!(counts[&1], 3);
        assert_eq!(dataset.majority_label(), Some(1));
    }

    #[test]
    fn test_majority_tie_prefers_smaller_label() {
        let features = Array2::<f32>::zeros((4, 1));
        let dataset = Dataset::new(features, array![3, 7, 7, 3]).unwrap();
        assert_eq!(dataset.majority_label(), Some(3));
    }

    #[test]
    fn test_select_keeps_rows_aligned() {
        let features = array![[0.0f32, 0.5], [1.0, 1.5], [2.0, 2.5]];
        let dataset = Dataset::new(features, array![10, 11, 12]).unwrap();

        let subset = dataset.select(&[2, 0]);
        assert_eq!(subset.n_rows(), 2);
        assert_eq!(subset.labels().to_vec(), vec![12, 10]);
        assert_eq!(subset.features()[[0, 1]], 2.5);
        assert_eq!(subset.features()[[1, 0]], 0.0);
    }
}
