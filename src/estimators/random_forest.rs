//! Random Forest implementation

use super::decision_tree::{DecisionTree, Targets};
use super::{check_fit_input, encode_labels, Classifier};
use crate::error::{KolosalError, Result};
use ndarray::ArrayView2;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Bagged classification trees with per-split feature subsampling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Fraction of features tried at each split
    pub max_features: f64,
    /// Bootstrap sampling
    pub bootstrap: bool,
    seed: u64,
    classes: Vec<i64>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators: n_estimators.max(1),
            max_depth: None,
            min_samples_leaf: 1,
            max_features: 0.5,
            bootstrap: true,
            seed: 0,
            classes: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_features(mut self, fraction: f64) -> Self {
        self.max_features = fraction;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[i64]) -> Result<()> {
        check_fit_input(&x, y)?;
        if !(self.max_features > 0.0 && self.max_features <= 1.0) {
            return Err(KolosalError::invalid_parameter(
                "max_features",
                self.max_features,
                "must be in (0, 1]",
            ));
        }

        let (classes, encoded) = encode_labels(y);
        let n_classes = classes.len();
        let n_samples = y.len();
        let n_features_per_split = ((self.max_features * x.ncols() as f64).round() as usize).max(1);

        let trees: Result<Vec<DecisionTree>> = (0..self.n_estimators)
            .into_par_iter()
            .map(|i| {
                let tree_seed = self.seed.wrapping_add(i as u64);
                let mut rng = Xoshiro256PlusPlus::seed_from_u64(tree_seed);
                let rows: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = DecisionTree::new_classifier()
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(n_features_per_split)
                    .with_seed(tree_seed);
                if let Some(depth) = self.max_depth {
                    tree = tree.with_max_depth(depth);
                }
                tree.fit_rows(x, Targets::Classes { y: &encoded, n_classes }, rows)?;
                Ok(tree)
            })
            .collect();

        self.trees = trees?;
        self.classes = classes;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<i64>> {
        if self.trees.is_empty() {
            return Err(KolosalError::ModelNotFitted);
        }

        let per_tree: Vec<Vec<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_values(x))
            .collect::<Result<_>>()?;

        let n_classes = self.classes.len();
        let predictions = (0..x.nrows())
            .map(|row| {
                let mut votes = vec![0usize; n_classes];
                for tree_pred in &per_tree {
                    votes[tree_pred[row] as usize] += 1;
                }
                let mut best = 0;
                for (class, &count) in votes.iter().enumerate() {
                    if count > votes[best] {
                        best = class;
                    }
                }
                self.classes[best]
            })
            .collect();

        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::test_data::{accuracy, blobs};

    #[test]
    fn test_forest_fits_blobs() {
        let (x, y) = blobs(25);
        let mut forest = RandomForest::new(10).with_max_depth(5).with_seed(3);
        forest.fit(x.view(), &y).unwrap();

        assert_eq!(forest.n_trees(), 10);
        let pred = forest.predict(x.view()).unwrap();
        assert!(accuracy(&pred, &y) > 0.95);
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let (x, y) = blobs(15);
        let mut a = RandomForest::new(5).with_seed(11);
        let mut b = RandomForest::new(5).with_seed(11);
        a.fit(x.view(), &y).unwrap();
        b.fit(x.view(), &y).unwrap();
        assert_eq!(a.predict(x.view()).unwrap(), b.predict(x.view()).unwrap());
    }

    #[test]
    fn test_invalid_max_features() {
        let (x, y) = blobs(5);
        let mut forest = RandomForest::new(2).with_max_features(0.0);
        assert!(forest.fit(x.view(), &y).is_err());
    }
}
