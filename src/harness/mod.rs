//! GPU versus CPU benchmark harness
//!
//! Loads a row-limited sample, splits it once, then runs the same search
//! against each requested estimator pool. Arms run one after another and
//! each is timed from search start to the end of held-out evaluation.

mod report;

pub use report::{ArmReport, ComparisonReport, HardwareSummary};

use crate::backend::{BackendRegistry, EstimatorBackend, EstimatorPool};
use crate::config::BenchmarkConfig;
use crate::data::{Dataset, SampleLoader, StratifiedSplitter, TrainTestSplit};
use crate::error::{KolosalError, Result};
use crate::evaluation::evaluate;
use crate::search::{EvolutionarySearch, PipelineSearch, SearchConfig, SearchOutcome};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Runs benchmark arms over one dataset sample
pub struct BenchmarkHarness {
    config: BenchmarkConfig,
    registry: BackendRegistry,
    search: Arc<dyn PipelineSearch>,
}

impl std::fmt::Debug for BenchmarkHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkHarness")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("search", &self.search.name())
            .finish()
    }
}

impl BenchmarkHarness {
    /// Harness with the CPU backend and the evolutionary search
    pub fn new(config: BenchmarkConfig) -> Self {
        Self {
            config,
            registry: BackendRegistry::with_defaults(),
            search: Arc::new(EvolutionarySearch::new()),
        }
    }

    pub fn with_registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Add a backend, e.g. a GPU pool
    pub fn with_backend(mut self, backend: Arc<dyn EstimatorBackend>) -> Self {
        self.registry.register(backend);
        self
    }

    pub fn with_search(mut self, search: Arc<dyn PipelineSearch>) -> Self {
        self.search = search;
        self
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Read the configured sample
    pub fn load(&self) -> Result<Dataset> {
        SampleLoader::new()
            .with_label_column(self.config.label_column)
            .load_sample(&self.config.data_path, self.config.row_limit)
    }

    pub fn split(&self, dataset: &Dataset) -> Result<TrainTestSplit> {
        let split = StratifiedSplitter::new(self.config.test_fraction, self.config.split_seed).split(dataset)?;
        debug!(train = split.train.n_rows(), test = split.test.n_rows(), "split sample");
        Ok(split)
    }

    /// Search settings for one arm: the shared base with `pool` applied
    pub fn arm_config(&self, pool: EstimatorPool) -> SearchConfig {
        self.config.search.clone().with_pool(pool)
    }

    /// Search `train` with the backend registered for `config.pool`
    pub fn run_search(&self, train: &Dataset, config: &SearchConfig) -> Result<SearchOutcome> {
        config.validate()?;
        let backend = self.registry.resolve(config.pool)?;
        self.search.search(train, config, backend.as_ref())
    }

    /// Run one timed arm on an existing split
    pub fn run_arm(&self, pool: EstimatorPool, split: &TrainTestSplit) -> Result<ArmReport> {
        let config = self.arm_config(pool);
        config.validate()?;
        let backend = self.registry.resolve(pool)?;

        info!(pool = %pool, backend = backend.name(), n_jobs = config.n_jobs, "starting arm");
        let start = Instant::now();
        let outcome = self.search.search(&split.train, &config, backend.as_ref())?;
        let accuracy = evaluate(&outcome.pipeline, &split.test)?;
        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(pool = %pool, accuracy, elapsed_secs, pipeline = %outcome.best_spec, "finished arm");

        Ok(ArmReport {
            pool,
            backend: backend.name().to_string(),
            n_jobs: config.n_jobs,
            accuracy,
            elapsed_secs,
            best_pipeline: outcome.pipeline.describe(),
            best_spec: outcome.best_spec,
            best_cv_score: outcome.best_score,
            evaluated_pipelines: outcome.evaluated_pipelines,
            generations: outcome.generations,
        })
    }

    /// Check every requested pool, then load, split, and run the arms GPU first
    pub fn compare(&self, pools: &[EstimatorPool]) -> Result<ComparisonReport> {
        let mut order: Vec<EstimatorPool> = Vec::new();
        for pool in [EstimatorPool::Gpu, EstimatorPool::Default] {
            if pools.contains(&pool) {
                order.push(pool);
            }
        }
        if order.is_empty() {
            return Err(KolosalError::InvalidInput("no estimator pool requested".to_string()));
        }

        self.config.validate()?;
        for &pool in &order {
            self.arm_config(pool).validate()?;
            self.registry.resolve(pool)?;
        }

        let dataset = self.load()?;
        info!(rows = dataset.n_rows(), features = dataset.n_features(), "loaded sample");
        let split = self.split(&dataset)?;

        let mut arms = Vec::with_capacity(order.len());
        for pool in order {
            arms.push(self.run_arm(pool, &split)?);
        }

        Ok(ComparisonReport {
            timestamp: Utc::now(),
            data_path: self.config.data_path.display().to_string(),
            n_train: split.train.n_rows(),
            n_test: split.test.n_rows(),
            n_features: dataset.n_features(),
            search: self.config.search.clone(),
            arms,
            hardware: HardwareSummary::detect(&self.registry),
        })
    }

    /// Both arms
    pub fn run(&self) -> Result<ComparisonReport> {
        self.compare(&[EstimatorPool::Gpu, EstimatorPool::Default])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{make_classification, DataSaver, SyntheticConfig};
    use tempfile::tempdir;

    fn quick_config(path: std::path::PathBuf) -> BenchmarkConfig {
        BenchmarkConfig::default().with_data_path(path).with_row_limit(200).with_search(
            SearchConfig::default()
                .with_generations(1)
                .with_population_size(3)
                .with_cv_folds(2)
                .with_verbosity(0),
        )
    }

    #[test]
    fn test_cpu_arm_end_to_end() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.csv.gz");
        let data = make_classification(&SyntheticConfig::new(300, 4, 3).with_class_sep(2.0)).unwrap();
        DataSaver::save_csv_gz(&data, &path).unwrap();

        let harness = BenchmarkHarness::new(quick_config(path));
        let report = harness.compare(&[EstimatorPool::Default]).unwrap();
        assert_eq!(report.n_train + report.n_test, 200);
        assert_eq!(report.n_test, 40);
        assert_eq!(report.arms.len(), 1);
        let arm = &report.arms[0];
        assert!((0.0..=1.0).contains(&arm.accuracy));
        assert!(arm.accuracy > 0.8);
        assert_eq!(arm.generations.len(), 1);
    }

    #[test]
    fn test_gpu_checked_before_loading() {
        // The data file does not exist: the unsupported pool must be reported first
        let harness = BenchmarkHarness::new(quick_config("missing.csv.gz".into()));
        let err = harness.run().unwrap_err();
        assert!(matches!(err, KolosalError::ConfigurationUnsupported(_)));

        let err = harness.compare(&[EstimatorPool::Default]).unwrap_err();
        assert!(matches!(err, KolosalError::DataUnavailable { .. }));
    }

    #[test]
    fn test_arm_configs_differ_only_in_pool_and_jobs() {
        let harness = BenchmarkHarness::new(BenchmarkConfig::default());
        let gpu = harness.arm_config(EstimatorPool::Gpu);
        let cpu = harness.arm_config(EstimatorPool::Default);
        assert_eq!(gpu.n_jobs, 1);
        assert_eq!(cpu.n_jobs, -1);
        assert_eq!(gpu.clone().with_n_jobs(-1).with_pool(EstimatorPool::Default), cpu.clone().with_pool(EstimatorPool::Default));
        assert_eq!(gpu.generations, cpu.generations);
        assert_eq!(gpu.random_state, cpu.random_state);
    }
}
