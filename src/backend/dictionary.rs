//! Configuration dictionaries: the operators and hyperparameter choices
//! a search is allowed to combine

use crate::error::{KolosalError, Result};
use crate::estimators::{Criterion, EstimatorSpec, TransformerSpec};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Discrete choices for one hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamRange<T>(pub Vec<T>);

impl<T: Clone> ParamRange<T> {
    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        // Emptiness is rejected by `ConfigDictionary::validate`
        self.0.choose(rng).cloned().unwrap_or_else(|| self.0[0].clone())
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> From<Vec<T>> for ParamRange<T> {
    fn from(values: Vec<T>) -> Self {
        ParamRange(values)
    }
}

/// One estimator with its hyperparameter grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "estimator", rename_all = "snake_case")]
pub enum EstimatorChoice {
    GaussianNb {
        var_smoothing: ParamRange<f64>,
    },
    LogisticRegression {
        alpha: ParamRange<f64>,
        learning_rate: ParamRange<f64>,
        max_iter: ParamRange<usize>,
    },
    DecisionTree {
        criterion: ParamRange<Criterion>,
        max_depth: ParamRange<usize>,
        min_samples_split: ParamRange<usize>,
        min_samples_leaf: ParamRange<usize>,
    },
    RandomForest {
        n_estimators: ParamRange<usize>,
        max_depth: ParamRange<usize>,
        max_features: ParamRange<f64>,
        min_samples_leaf: ParamRange<usize>,
        bootstrap: ParamRange<bool>,
    },
    GradientBoosting {
        n_estimators: ParamRange<usize>,
        learning_rate: ParamRange<f64>,
        max_depth: ParamRange<usize>,
        subsample: ParamRange<f64>,
        min_samples_leaf: ParamRange<usize>,
    },
}

impl EstimatorChoice {
    pub fn name(&self) -> &'static str {
        match self {
            EstimatorChoice::GaussianNb { .. } => "GaussianNB",
            EstimatorChoice::LogisticRegression { .. } => "LogisticRegression",
            EstimatorChoice::DecisionTree { .. } => "DecisionTreeClassifier",
            EstimatorChoice::RandomForest { .. } => "RandomForestClassifier",
            EstimatorChoice::GradientBoosting { .. } => "GradientBoostingClassifier",
        }
    }

    fn n_params(&self) -> usize {
        match self {
            EstimatorChoice::GaussianNb { .. } => 1,
            EstimatorChoice::LogisticRegression { .. } => 3,
            EstimatorChoice::DecisionTree { .. } => 4,
            EstimatorChoice::RandomForest { .. } | EstimatorChoice::GradientBoosting { .. } => 5,
        }
    }

    fn has_empty_range(&self) -> bool {
        match self {
            EstimatorChoice::GaussianNb { var_smoothing } => var_smoothing.is_empty(),
            EstimatorChoice::LogisticRegression { alpha, learning_rate, max_iter } => {
                alpha.is_empty() || learning_rate.is_empty() || max_iter.is_empty()
            }
            EstimatorChoice::DecisionTree { criterion, max_depth, min_samples_split, min_samples_leaf } => {
                criterion.is_empty() || max_depth.is_empty() || min_samples_split.is_empty() || min_samples_leaf.is_empty()
            }
            EstimatorChoice::RandomForest { n_estimators, max_depth, max_features, min_samples_leaf, bootstrap } => {
                n_estimators.is_empty()
                    || max_depth.is_empty()
                    || max_features.is_empty()
                    || min_samples_leaf.is_empty()
                    || bootstrap.is_empty()
            }
            EstimatorChoice::GradientBoosting { n_estimators, learning_rate, max_depth, subsample, min_samples_leaf } => {
                n_estimators.is_empty()
                    || learning_rate.is_empty()
                    || max_depth.is_empty()
                    || subsample.is_empty()
                    || min_samples_leaf.is_empty()
            }
        }
    }

    /// Draw every hyperparameter at random
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> EstimatorSpec {
        match self {
            EstimatorChoice::GaussianNb { var_smoothing } => EstimatorSpec::GaussianNb {
                var_smoothing: var_smoothing.pick(rng),
            },
            EstimatorChoice::LogisticRegression { alpha, learning_rate, max_iter } => {
                EstimatorSpec::LogisticRegression {
                    alpha: alpha.pick(rng),
                    learning_rate: learning_rate.pick(rng),
                    max_iter: max_iter.pick(rng),
                }
            }
            EstimatorChoice::DecisionTree { criterion, max_depth, min_samples_split, min_samples_leaf } => {
                EstimatorSpec::DecisionTree {
                    criterion: criterion.pick(rng),
                    max_depth: max_depth.pick(rng),
                    min_samples_split: min_samples_split.pick(rng),
                    min_samples_leaf: min_samples_leaf.pick(rng),
                }
            }
            EstimatorChoice::RandomForest { n_estimators, max_depth, max_features, min_samples_leaf, bootstrap } => {
                EstimatorSpec::RandomForest {
                    n_estimators: n_estimators.pick(rng),
                    max_depth: max_depth.pick(rng),
                    max_features: max_features.pick(rng),
                    min_samples_leaf: min_samples_leaf.pick(rng),
                    bootstrap: bootstrap.pick(rng),
                }
            }
            EstimatorChoice::GradientBoosting { n_estimators, learning_rate, max_depth, subsample, min_samples_leaf } => {
                EstimatorSpec::GradientBoosting {
                    n_estimators: n_estimators.pick(rng),
                    learning_rate: learning_rate.pick(rng),
                    max_depth: max_depth.pick(rng),
                    subsample: subsample.pick(rng),
                    min_samples_leaf: min_samples_leaf.pick(rng),
                }
            }
        }
    }

    /// Resample exactly one hyperparameter of `spec`.
    ///
    /// A spec of a different estimator is replaced by a fresh sample.
    pub fn mutate<R: Rng + ?Sized>(&self, spec: &EstimatorSpec, rng: &mut R) -> EstimatorSpec {
        let which = rng.gen_range(0..self.n_params());
        let mut out = spec.clone();
        match (self, &mut out) {
            (EstimatorChoice::GaussianNb { var_smoothing }, EstimatorSpec::GaussianNb { var_smoothing: v }) => {
                *v = var_smoothing.pick(rng);
            }
            (
                EstimatorChoice::LogisticRegression { alpha, learning_rate, max_iter },
                EstimatorSpec::LogisticRegression { alpha: a, learning_rate: lr, max_iter: mi },
            ) => match which {
                0 => *a = alpha.pick(rng),
                1 => *lr = learning_rate.pick(rng),
                _ => *mi = max_iter.pick(rng),
            },
            (
                EstimatorChoice::DecisionTree { criterion, max_depth, min_samples_split, min_samples_leaf },
                EstimatorSpec::DecisionTree { criterion: c, max_depth: d, min_samples_split: s, min_samples_leaf: l },
            ) => match which {
                0 => *c = criterion.pick(rng),
                1 => *d = max_depth.pick(rng),
                2 => *s = min_samples_split.pick(rng),
                _ => *l = min_samples_leaf.pick(rng),
            },
            (
                EstimatorChoice::RandomForest { n_estimators, max_depth, max_features, min_samples_leaf, bootstrap },
                EstimatorSpec::RandomForest { n_estimators: n, max_depth: d, max_features: f, min_samples_leaf: l, bootstrap: b },
            ) => match which {
                0 => *n = n_estimators.pick(rng),
                1 => *d = max_depth.pick(rng),
                2 => *f = max_features.pick(rng),
                3 => *l = min_samples_leaf.pick(rng),
                _ => *b = bootstrap.pick(rng),
            },
            (
                EstimatorChoice::GradientBoosting { n_estimators, learning_rate, max_depth, subsample, min_samples_leaf },
                EstimatorSpec::GradientBoosting { n_estimators: n, learning_rate: lr, max_depth: d, subsample: s, min_samples_leaf: l },
            ) => match which {
                0 => *n = n_estimators.pick(rng),
                1 => *lr = learning_rate.pick(rng),
                2 => *d = max_depth.pick(rng),
                3 => *s = subsample.pick(rng),
                _ => *l = min_samples_leaf.pick(rng),
            },
            _ => return self.sample(rng),
        }
        out
    }
}

/// Operators available to one estimator pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDictionary {
    pub estimators: Vec<EstimatorChoice>,
    pub preprocessors: Vec<TransformerSpec>,
    /// Longest preprocessor chain in front of the estimator
    pub max_preprocessors: usize,
}

impl ConfigDictionary {
    /// Every native estimator and scaler
    pub fn default_pool() -> Self {
        Self {
            estimators: vec![
                EstimatorChoice::GaussianNb {
                    var_smoothing: vec![1e-9, 1e-7, 1e-5].into(),
                },
                EstimatorChoice::LogisticRegression {
                    alpha: vec![1e-4, 1e-3, 1e-2, 1e-1].into(),
                    learning_rate: vec![0.05, 0.1, 0.5].into(),
                    max_iter: vec![100, 200].into(),
                },
                EstimatorChoice::DecisionTree {
                    criterion: vec![Criterion::Gini, Criterion::Entropy].into(),
                    max_depth: vec![2, 4, 6, 8, 10].into(),
                    min_samples_split: vec![2, 5, 10, 20].into(),
                    min_samples_leaf: vec![1, 5, 10, 20].into(),
                },
                EstimatorChoice::RandomForest {
                    n_estimators: vec![20, 50].into(),
                    max_depth: vec![4, 6, 8, 10].into(),
                    max_features: vec![0.2, 0.35, 0.5, 0.75, 1.0].into(),
                    min_samples_leaf: vec![1, 5, 10].into(),
                    bootstrap: vec![true, false].into(),
                },
                EstimatorChoice::GradientBoosting {
                    n_estimators: vec![20, 50].into(),
                    learning_rate: vec![0.01, 0.1, 0.5].into(),
                    max_depth: vec![2, 3, 4, 6].into(),
                    subsample: vec![0.5, 0.8, 1.0].into(),
                    min_samples_leaf: vec![1, 5, 10].into(),
                },
            ],
            preprocessors: vec![
                TransformerSpec::StandardScaler,
                TransformerSpec::MinMaxScaler,
                TransformerSpec::MaxAbsScaler,
            ],
            max_preprocessors: 2,
        }
    }

    /// Restricted operator set of GPU-accelerated pools: linear models and
    /// tree ensembles, with wider ensemble ranges
    pub fn gpu_pool() -> Self {
        Self {
            estimators: vec![
                EstimatorChoice::LogisticRegression {
                    alpha: vec![1e-4, 1e-3, 1e-2, 1e-1, 1.0].into(),
                    learning_rate: vec![0.05, 0.1, 0.5].into(),
                    max_iter: vec![100, 200, 500].into(),
                },
                EstimatorChoice::RandomForest {
                    n_estimators: vec![50, 100, 200].into(),
                    max_depth: vec![6, 8, 10, 12].into(),
                    max_features: vec![0.2, 0.35, 0.5, 0.75, 1.0].into(),
                    min_samples_leaf: vec![1, 5, 10].into(),
                    bootstrap: vec![true].into(),
                },
                EstimatorChoice::GradientBoosting {
                    n_estimators: vec![50, 100, 200].into(),
                    learning_rate: vec![0.01, 0.1, 0.3, 0.5].into(),
                    max_depth: vec![3, 4, 6, 8].into(),
                    subsample: vec![0.5, 0.8, 1.0].into(),
                    min_samples_leaf: vec![1, 5, 10].into(),
                },
            ],
            preprocessors: vec![TransformerSpec::StandardScaler, TransformerSpec::MinMaxScaler],
            max_preprocessors: 1,
        }
    }

    /// Reject dictionaries the search cannot draw from
    pub fn validate(&self) -> Result<()> {
        if self.estimators.is_empty() {
            return Err(KolosalError::ConfigError("configuration dictionary has no estimators".to_string()));
        }
        if let Some(choice) = self.estimators.iter().find(|c| c.has_empty_range()) {
            return Err(KolosalError::ConfigError(format!(
                "{} has an empty hyperparameter range",
                choice.name()
            )));
        }
        if self.preprocessors.is_empty() && self.max_preprocessors > 0 {
            return Err(KolosalError::ConfigError(
                "max_preprocessors > 0 but no preprocessors are listed".to_string(),
            ));
        }
        Ok(())
    }

    /// Grid entry for the estimator that produced `spec`
    pub fn choice_for(&self, spec: &EstimatorSpec) -> Option<&EstimatorChoice> {
        self.estimators.iter().find(|c| c.name() == spec.name())
    }

    pub fn random_estimator<R: Rng + ?Sized>(&self, rng: &mut R) -> EstimatorSpec {
        let idx = rng.gen_range(0..self.estimators.len());
        self.estimators[idx].sample(rng)
    }

    pub fn random_preprocessor<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<TransformerSpec> {
        self.preprocessors.choose(rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_builtin_dictionaries_validate() {
        assert!(ConfigDictionary::default_pool().validate().is_ok());
        assert!(ConfigDictionary::gpu_pool().validate().is_ok());
    }

    #[test]
    fn test_empty_range_rejected() {
        let mut dict = ConfigDictionary::default_pool();
        dict.estimators.push(EstimatorChoice::GaussianNb { var_smoothing: ParamRange(vec![]) });
        assert!(matches!(dict.validate(), Err(KolosalError::ConfigError(_))));
    }

    #[test]
    fn test_gpu_pool_is_restricted() {
        let names: Vec<_> = ConfigDictionary::gpu_pool().estimators.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["LogisticRegression", "RandomForestClassifier", "GradientBoostingClassifier"]);
    }

    #[test]
    fn test_mutation_changes_at_most_one_param() {
        let dict = ConfigDictionary::default_pool();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..50 {
            let spec = dict.random_estimator(&mut rng);
            let choice = dict.choice_for(&spec).unwrap();
            let mutated = choice.mutate(&spec, &mut rng);
            assert_eq!(mutated.name(), spec.name());
            let differing = spec
                .params()
                .iter()
                .zip(mutated.params().iter())
                .filter(|(a, b)| a != b)
                .count();
            assert!(differing <= 1);
        }
    }
}
