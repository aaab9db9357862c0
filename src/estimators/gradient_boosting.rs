//! Gradient Boosting implementation
//!
//! Log-loss boosting of shallow regression trees, similar in spirit to
//! XGBoost/LightGBM but much simpler. More than two classes are handled
//! one-vs-rest.

use super::decision_tree::{DecisionTree, Targets};
use super::{check_fit_input, check_width, encode_labels, Classifier};
use crate::error::{KolosalError, Result};
use ndarray::ArrayView2;
use rand::seq::index;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One binary booster: positive class vs the rest
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinaryBooster {
    initial_log_odds: f64,
    trees: Vec<DecisionTree>,
}

impl BinaryBooster {
    fn decision(&self, x: ArrayView2<'_, f64>, learning_rate: f64) -> Result<Vec<f64>> {
        let mut scores = vec![self.initial_log_odds; x.nrows()];
        for tree in &self.trees {
            for (score, step) in scores.iter_mut().zip(tree.predict_values(x)?) {
                *score += learning_rate * step;
            }
        }
        Ok(scores)
    }
}

/// Gradient boosted trees classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Row subsample ratio for each tree
    pub subsample: f64,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    seed: u64,
    boosters: Vec<BinaryBooster>,
    classes: Vec<i64>,
    n_features: usize,
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self::new(100)
    }
}

impl GradientBoosting {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators: n_estimators.max(1),
            learning_rate: 0.1,
            max_depth: 3,
            subsample: 1.0,
            min_samples_leaf: 1,
            seed: 0,
            boosters: Vec::new(),
            classes: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    pub fn with_subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn fit_binary(&self, x: ArrayView2<'_, f64>, positive: &[f64], seed: u64) -> Result<BinaryBooster> {
        let n_samples = positive.len();
        let p = (positive.iter().sum::<f64>() / n_samples as f64).clamp(1e-6, 1.0 - 1e-6);
        let initial_log_odds = (p / (1.0 - p)).ln();

        let mut log_odds = vec![initial_log_odds; n_samples];
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let n_rows = ((self.subsample * n_samples as f64).round() as usize).clamp(1, n_samples);
        let mut trees = Vec::with_capacity(self.n_estimators);

        for round in 0..self.n_estimators {
            // Negative gradient of log loss
            let residuals: Vec<f64> = positive
                .iter()
                .zip(&log_odds)
                .map(|(yi, lo)| yi - 1.0 / (1.0 + (-lo).exp()))
                .collect();

            let rows = if n_rows < n_samples {
                index::sample(&mut rng, n_samples, n_rows).into_vec()
            } else {
                (0..n_samples).collect()
            };

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(self.max_depth)
                .with_min_samples_leaf(self.min_samples_leaf)
                .with_seed(seed.wrapping_add(round as u64));
            tree.fit_rows(x, Targets::Values(&residuals), rows)?;

            for (lo, step) in log_odds.iter_mut().zip(tree.predict_values(x)?) {
                *lo += self.learning_rate * step;
            }
            trees.push(tree);
        }

        Ok(BinaryBooster { initial_log_odds, trees })
    }
}

impl Classifier for GradientBoosting {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[i64]) -> Result<()> {
        check_fit_input(&x, y)?;
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(KolosalError::invalid_parameter("subsample", self.subsample, "must be in (0, 1]"));
        }

        let (classes, encoded) = encode_labels(y);
        // Binary problems need a single booster for the larger label
        let positives: Vec<usize> = if classes.len() <= 2 {
            vec![classes.len() - 1]
        } else {
            (0..classes.len()).collect()
        };

        self.boosters = positives
            .par_iter()
            .map(|&class| {
                let target: Vec<f64> = encoded.iter().map(|&c| if c == class { 1.0 } else { 0.0 }).collect();
                self.fit_binary(x, &target, self.seed.wrapping_add(class as u64 * 7919))
            })
            .collect::<Result<_>>()?;
        self.classes = classes;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<i64>> {
        if self.boosters.is_empty() {
            return Err(KolosalError::ModelNotFitted);
        }
        check_width(&x, self.n_features)?;

        let scores: Vec<Vec<f64>> = self
            .boosters
            .iter()
            .map(|b| b.decision(x, self.learning_rate))
            .collect::<Result<_>>()?;

        if self.classes.len() <= 2 {
            let positive = self.classes.len() - 1;
            return Ok(scores[0]
                .iter()
                .map(|&s| if s > 0.0 { self.classes[positive] } else { self.classes[0] })
                .collect());
        }

        Ok((0..x.nrows())
            .map(|row| {
                let mut best = 0;
                for class in 1..scores.len() {
                    if scores[class][row] > scores[best][row] {
                        best = class;
                    }
                }
                self.classes[best]
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::test_data::{accuracy, blobs};
    use ndarray::Array2;

    #[test]
    fn test_binary_blobs() {
        let (x, y) = blobs(30);
        let mut model = GradientBoosting::new(20).with_learning_rate(0.3).with_max_depth(2);
        model.fit(x.view(), &y).unwrap();
        let pred = model.predict(x.view()).unwrap();
        assert_eq!(accuracy(&pred, &y), 1.0);
    }

    #[test]
    fn test_multiclass_one_vs_rest() {
        let x = Array2::from_shape_fn((60, 1), |(i, _)| (i % 3) as f64 * 5.0 + (i % 4) as f64 * 0.1);
        let y: Vec<i64> = (0..60).map(|i| (i % 3) as i64 + 10).collect();
        let mut model = GradientBoosting::new(15).with_learning_rate(0.5).with_max_depth(2);
        model.fit(x.view(), &y).unwrap();
        let pred = model.predict(x.view()).unwrap();
        assert_eq!(accuracy(&pred, &y), 1.0);
    }

    #[test]
    fn test_subsample_validated() {
        let (x, y) = blobs(5);
        let mut model = GradientBoosting::new(2).with_subsample(1.5);
        assert!(model.fit(x.view(), &y).is_err());
    }
}
