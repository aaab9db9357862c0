//! Stratified k-fold scoring for candidate pipelines

use crate::backend::EstimatorBackend;
use crate::error::{KolosalError, Result};
use crate::evaluation::accuracy;
use crate::pipeline::PipelineSpec;
use ndarray::{ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// A single train/validation split
#[derive(Debug, Clone)]
pub struct CvFold {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified K-Fold (maintains class distribution in every fold)
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    seed: u64,
    max_train_rows: Option<usize>,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed, max_train_rows: None }
    }

    /// Subsample each fold's training part down to `rows`
    pub fn with_max_train_rows(mut self, rows: Option<usize>) -> Self {
        self.max_train_rows = rows;
        self
    }

    pub fn split(&self, y: &[i64]) -> Result<Vec<CvFold>> {
        if self.n_splits < 2 {
            return Err(KolosalError::invalid_parameter("cv_folds", self.n_splits, "must be at least 2"));
        }
        if y.len() < self.n_splits {
            return Err(KolosalError::InvalidInput(format!(
                "{} training rows cannot form {} folds",
                y.len(),
                self.n_splits
            )));
        }

        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &label) in y.iter().enumerate() {
            class_indices.entry(label).or_default().push(idx);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        for indices in class_indices.values_mut() {
            indices.shuffle(&mut rng);
        }

        // Deal every class round-robin, continuing where the previous class stopped
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        let mut next = 0;
        for indices in class_indices.values() {
            for &idx in indices {
                folds[next].push(idx);
                next = (next + 1) % self.n_splits;
            }
        }

        let mut splits = Vec::with_capacity(self.n_splits);
        for fold_idx in 0..self.n_splits {
            let mut train_indices: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, f)| f.iter().copied())
                .collect();

            if let Some(cap) = self.max_train_rows {
                if train_indices.len() > cap {
                    train_indices.shuffle(&mut rng);
                    train_indices.truncate(cap);
                    train_indices.sort_unstable();
                }
            }

            splits.push(CvFold {
                train_indices,
                test_indices: folds[fold_idx].clone(),
                fold_idx,
            });
        }

        Ok(splits)
    }
}

/// Mean validation accuracy of `spec` over `folds`
pub fn cross_val_score(
    spec: &PipelineSpec,
    x: ArrayView2<'_, f64>,
    y: &[i64],
    folds: &[CvFold],
    backend: &dyn EstimatorBackend,
    seed: u64,
) -> Result<f64> {
    let mut total = 0.0;
    for fold in folds {
        let x_train = x.select(Axis(0), &fold.train_indices);
        let y_train: Vec<i64> = fold.train_indices.iter().map(|&i| y[i]).collect();
        let x_test = x.select(Axis(0), &fold.test_indices);
        let y_test: Vec<i64> = fold.test_indices.iter().map(|&i| y[i]).collect();

        let fitted = spec.fit(x_train.view(), &y_train, backend, seed)?;
        let predictions = fitted.predict_f64(x_test.view())?;
        total += accuracy(&y_test, &predictions)?;
    }
    Ok(total / folds.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use crate::estimators::test_data::blobs;
    use crate::estimators::EstimatorSpec;

    #[test]
    fn test_folds_partition_rows() {
        let y: Vec<i64> = (0..23).map(|i| (i % 3 == 0) as i64).collect();
        let folds = StratifiedKFold::new(4, 7).split(&y).unwrap();
        assert_eq!(folds.len(), 4);

        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test_indices.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());

        for fold in &folds {
            assert_eq!(fold.train_indices.len() + fold.test_indices.len(), 23);
            let sizes = fold.test_indices.len();
            assert!((5..=6).contains(&sizes));
        }
    }

    #[test]
    fn test_folds_are_stratified() {
        let y: Vec<i64> = (0..100).map(|i| (i < 30) as i64).collect();
        for fold in StratifiedKFold::new(5, 1).split(&y).unwrap() {
            let positives = fold.test_indices.iter().filter(|&&i| y[i] == 1).count();
            assert_eq!(positives, 6);
        }
    }

    #[test]
    fn test_train_cap() {
        let y: Vec<i64> = (0..50).map(|i| i % 2).collect();
        let folds = StratifiedKFold::new(5, 0).with_max_train_rows(Some(10)).split(&y).unwrap();
        assert!(folds.iter().all(|f| f.train_indices.len() == 10));
    }

    #[test]
    fn test_too_few_rows() {
        assert!(matches!(
            StratifiedKFold::new(5, 0).split(&[0, 1, 0]),
            Err(KolosalError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_cross_val_score_on_separable_data() {
        let (x, y) = blobs(25);
        let folds = StratifiedKFold::new(5, 3).split(&y).unwrap();
        let spec = PipelineSpec::new(EstimatorSpec::GaussianNb { var_smoothing: 1e-9 });
        let score = cross_val_score(&spec, x.view(), &y, &folds, &CpuBackend::new(), 0).unwrap();
        assert!((score - 1.0).abs() < 1e-12);
    }
}
