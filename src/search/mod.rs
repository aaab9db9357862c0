//! Automated pipeline search
//!
//! [`PipelineSearch`] is the seam between the benchmark and the optimizer.
//! [`EvolutionarySearch`] is the implementation shipped with the crate.

mod config;
pub mod cv;
mod evolutionary;

pub use config::SearchConfig;
pub use cv::{cross_val_score, CvFold, StratifiedKFold};
pub use evolutionary::EvolutionarySearch;

use crate::backend::{BackendRegistry, EstimatorBackend};
use crate::data::Dataset;
use crate::error::Result;
use crate::pipeline::{FittedPipeline, PipelineSpec};
use serde::{Deserialize, Serialize};

/// Progress after one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: usize,
    /// Best internal CV score in the surviving population
    pub best_score: f64,
    /// Mean over survivors that evaluated successfully
    pub mean_score: f64,
    /// Pipelines scored for the first time in this generation
    pub evaluated: usize,
}

/// Result of a completed search
#[derive(Debug)]
pub struct SearchOutcome {
    /// Best pipeline, refitted on the whole training set
    pub pipeline: FittedPipeline,
    pub best_spec: PipelineSpec,
    pub best_score: f64,
    pub generations: Vec<GenerationSummary>,
    pub evaluated_pipelines: usize,
}

/// An automated search over pipelines
pub trait PipelineSearch: Send + Sync {
    fn name(&self) -> &str;

    /// Search for the best pipeline on `train` using operators from `backend`
    fn search(&self, train: &Dataset, config: &SearchConfig, backend: &dyn EstimatorBackend) -> Result<SearchOutcome>;
}

/// Run the evolutionary search with the backend registered for `config.pool`
pub fn run_search(train: &Dataset, config: &SearchConfig, registry: &BackendRegistry) -> Result<SearchOutcome> {
    let backend = registry.resolve(config.pool)?;
    EvolutionarySearch::new().search(train, config, backend.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::EstimatorPool;
    use crate::data::{make_classification, SyntheticConfig};
    use crate::error::KolosalError;

    #[test]
    fn test_run_search_without_gpu_backend() {
        let data = make_classification(&SyntheticConfig::new(60, 2, 1)).unwrap();
        let config = SearchConfig::for_pool(EstimatorPool::Gpu);
        let err = run_search(&data, &config, &BackendRegistry::with_defaults()).unwrap_err();
        assert!(matches!(err, KolosalError::ConfigurationUnsupported(_)));
    }

    #[test]
    fn test_run_search_cpu() {
        let data = make_classification(&SyntheticConfig::new(60, 2, 1).with_class_sep(2.0)).unwrap();
        let config = SearchConfig::default()
            .with_generations(1)
            .with_population_size(3)
            .with_cv_folds(2)
            .with_verbosity(0);
        let outcome = run_search(&data, &config, &BackendRegistry::with_defaults()).unwrap();
        assert_eq!(outcome.generations.len(), 1);
        assert!(outcome.best_score.is_finite());
    }
}
