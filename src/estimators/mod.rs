//! Native estimators used by the CPU backend
//!
//! Classifiers and feature transformers that a pipeline search can
//! combine. Each one has a serialisable spec (its hyperparameters)
//! so pipelines can be described, cached and rebuilt.
//!
//! - [`GaussianNaiveBayes`]
//! - [`LogisticRegression`] (one-vs-rest for more than two classes)
//! - [`DecisionTree`] classification and regression trees
//! - [`RandomForest`] bagged trees with feature subsampling
//! - [`GradientBoosting`] log-loss boosting (one-vs-rest)
//! - scalers: standard, min-max, max-abs

pub mod decision_tree;
pub mod gradient_boosting;
pub mod linear;
pub mod naive_bayes;
pub mod random_forest;
pub mod scalers;

pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use gradient_boosting::GradientBoosting;
pub use linear::LogisticRegression;
pub use naive_bayes::GaussianNaiveBayes;
pub use random_forest::RandomForest;
pub use scalers::{MaxAbsScaler, MinMaxScaler, StandardScaler};

use crate::error::{KolosalError, Result};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fitted-or-not classifier over `f64` features and integer labels
pub trait Classifier: Send + Sync {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[i64]) -> Result<()>;

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<i64>>;
}

/// A stateless-after-fit feature transformation
pub trait Transformer: Send + Sync {
    fn fit(&mut self, x: ArrayView2<'_, f64>) -> Result<()>;

    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>>;

    fn fit_transform(&mut self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Classifier hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "estimator", rename_all = "snake_case")]
pub enum EstimatorSpec {
    GaussianNb {
        var_smoothing: f64,
    },
    LogisticRegression {
        alpha: f64,
        learning_rate: f64,
        max_iter: usize,
    },
    DecisionTree {
        criterion: Criterion,
        max_depth: usize,
        min_samples_split: usize,
        min_samples_leaf: usize,
    },
    RandomForest {
        n_estimators: usize,
        max_depth: usize,
        max_features: f64,
        min_samples_leaf: usize,
        bootstrap: bool,
    },
    GradientBoosting {
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
        subsample: f64,
        min_samples_leaf: usize,
    },
}

impl EstimatorSpec {
    /// Operator name as shown in pipeline descriptions
    pub fn name(&self) -> &'static str {
        match self {
            EstimatorSpec::GaussianNb { .. } => "GaussianNB",
            EstimatorSpec::LogisticRegression { .. } => "LogisticRegression",
            EstimatorSpec::DecisionTree { .. } => "DecisionTreeClassifier",
            EstimatorSpec::RandomForest { .. } => "RandomForestClassifier",
            EstimatorSpec::GradientBoosting { .. } => "GradientBoostingClassifier",
        }
    }

    /// Hyperparameters as `name=value` pairs in a stable order
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            EstimatorSpec::GaussianNb { var_smoothing } => {
                vec![("var_smoothing", format!("{:e}", var_smoothing))]
            }
            EstimatorSpec::LogisticRegression { alpha, learning_rate, max_iter } => vec![
                ("alpha", alpha.to_string()),
                ("learning_rate", learning_rate.to_string()),
                ("max_iter", max_iter.to_string()),
            ],
            EstimatorSpec::DecisionTree { criterion, max_depth, min_samples_split, min_samples_leaf } => vec![
                ("criterion", criterion.to_string()),
                ("max_depth", max_depth.to_string()),
                ("min_samples_split", min_samples_split.to_string()),
                ("min_samples_leaf", min_samples_leaf.to_string()),
            ],
            EstimatorSpec::RandomForest { n_estimators, max_depth, max_features, min_samples_leaf, bootstrap } => vec![
                ("n_estimators", n_estimators.to_string()),
                ("max_depth", max_depth.to_string()),
                ("max_features", max_features.to_string()),
                ("min_samples_leaf", min_samples_leaf.to_string()),
                ("bootstrap", bootstrap.to_string()),
            ],
            EstimatorSpec::GradientBoosting { n_estimators, learning_rate, max_depth, subsample, min_samples_leaf } => vec![
                ("n_estimators", n_estimators.to_string()),
                ("learning_rate", learning_rate.to_string()),
                ("max_depth", max_depth.to_string()),
                ("subsample", subsample.to_string()),
                ("min_samples_leaf", min_samples_leaf.to_string()),
            ],
        }
    }

    /// Instantiate an unfitted native classifier
    pub fn build(&self, seed: u64) -> Box<dyn Classifier> {
        match *self {
            EstimatorSpec::GaussianNb { var_smoothing } => {
                Box::new(GaussianNaiveBayes::new().with_var_smoothing(var_smoothing))
            }
            EstimatorSpec::LogisticRegression { alpha, learning_rate, max_iter } => Box::new(
                LogisticRegression::new()
                    .with_alpha(alpha)
                    .with_learning_rate(learning_rate)
                    .with_max_iter(max_iter),
            ),
            EstimatorSpec::DecisionTree { criterion, max_depth, min_samples_split, min_samples_leaf } => Box::new(
                DecisionTree::new_classifier()
                    .with_criterion(criterion)
                    .with_max_depth(max_depth)
                    .with_min_samples_split(min_samples_split)
                    .with_min_samples_leaf(min_samples_leaf)
                    .with_seed(seed),
            ),
            EstimatorSpec::RandomForest { n_estimators, max_depth, max_features, min_samples_leaf, bootstrap } => Box::new(
                RandomForest::new(n_estimators)
                    .with_max_depth(max_depth)
                    .with_max_features(max_features)
                    .with_min_samples_leaf(min_samples_leaf)
                    .with_bootstrap(bootstrap)
                    .with_seed(seed),
            ),
            EstimatorSpec::GradientBoosting { n_estimators, learning_rate, max_depth, subsample, min_samples_leaf } => Box::new(
                GradientBoosting::new(n_estimators)
                    .with_learning_rate(learning_rate)
                    .with_max_depth(max_depth)
                    .with_subsample(subsample)
                    .with_min_samples_leaf(min_samples_leaf)
                    .with_seed(seed),
            ),
        }
    }
}

/// Preprocessing operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformerSpec {
    StandardScaler,
    MinMaxScaler,
    MaxAbsScaler,
}

impl TransformerSpec {
    pub fn name(&self) -> &'static str {
        match self {
            TransformerSpec::StandardScaler => "StandardScaler",
            TransformerSpec::MinMaxScaler => "MinMaxScaler",
            TransformerSpec::MaxAbsScaler => "MaxAbsScaler",
        }
    }

    pub fn build(&self) -> Box<dyn Transformer> {
        match self {
            TransformerSpec::StandardScaler => Box::new(StandardScaler::new()),
            TransformerSpec::MinMaxScaler => Box::new(MinMaxScaler::new()),
            TransformerSpec::MaxAbsScaler => Box::new(MaxAbsScaler::new()),
        }
    }
}

impl fmt::Display for TransformerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sorted distinct labels and the position of each sample's label among them
pub(crate) fn encode_labels(y: &[i64]) -> (Vec<i64>, Vec<usize>) {
    let mut classes: Vec<i64> = y.to_vec();
    classes.sort_unstable();
    classes.dedup();
    let encoded = y
        .iter()
        .map(|label| classes.binary_search(label).unwrap_or(0))
        .collect();
    (classes, encoded)
}

/// Shared fit-time checks
pub(crate) fn check_fit_input(x: &ArrayView2<'_, f64>, y: &[i64]) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(KolosalError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if y.is_empty() {
        return Err(KolosalError::InvalidInput("cannot fit on zero rows".to_string()));
    }
    Ok(())
}

/// Shared predict-time width check
pub(crate) fn check_width(x: &ArrayView2<'_, f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(KolosalError::ShapeError {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_data {
    use ndarray::Array2;

    /// Two well separated blobs along a diagonal
    pub fn blobs(n_per_class: usize) -> (Array2<f64>, Vec<i64>) {
        let n = n_per_class * 2;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            let class = (i % 2) as f64;
            let jitter = ((i * 7 + j * 3) % 11) as f64 / 11.0 - 0.5;
            class * 4.0 + jitter
        });
        let y = (0..n).map(|i| (i % 2) as i64).collect();
        (x, y)
    }

    pub fn accuracy(pred: &[i64], y: &[i64]) -> f64 {
        let correct = pred.iter().zip(y).filter(|(p, t)| p == t).count();
        correct as f64 / y.len() as f64
    }
}
