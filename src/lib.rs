//! Kolosal Bench - GPU versus CPU estimator pools in an AutoML search
//!
//! Loads a row-limited sample of a labelled CSV, splits it with a fixed
//! seed, and runs the same pipeline search twice: once over the GPU pool
//! and once over the default CPU pool. Each arm reports held-out accuracy
//! and wall-clock time.
//!
//! # Modules
//!
//! - [`data`] - sample loading, stratified split, synthetic data
//! - [`estimators`] - native classifiers and scalers
//! - [`backend`] - estimator pools, backends, configuration dictionaries
//! - [`pipeline`] - pipeline specs and fitted pipelines
//! - [`search`] - search configuration and the evolutionary search
//! - [`evaluation`] - held-out accuracy
//! - [`harness`] - the two-arm comparison
//! - [`cli`] - command-line interface

// Core error handling
pub mod error;
pub mod config;

// Data and models
pub mod data;
pub mod estimators;
pub mod backend;
pub mod pipeline;

// Search and benchmarking
pub mod search;
pub mod evaluation;
pub mod harness;

// Interface
pub mod cli;

pub use error::{KolosalError, Result};

/// Prelude for common imports
pub mod prelude {
    pub use crate::backend::{BackendRegistry, ConfigDictionary, CpuBackend, EstimatorBackend, EstimatorPool};
    pub use crate::config::BenchmarkConfig;
    pub use crate::data::{load_sample, train_test_split, Dataset, TrainTestSplit};
    pub use crate::error::{KolosalError, Result};
    pub use crate::evaluation::{accuracy, evaluate};
    pub use crate::harness::{ArmReport, BenchmarkHarness, ComparisonReport};
    pub use crate::pipeline::{FittedPipeline, PipelineSpec};
    pub use crate::search::{run_search, EvolutionarySearch, PipelineSearch, SearchConfig, SearchOutcome};
}
