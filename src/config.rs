//! Benchmark configuration

use crate::error::{KolosalError, Result};
use crate::search::SearchConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything one benchmark run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Gzip (or plain) CSV, label first, no header
    pub data_path: PathBuf,
    /// Rows read from the top of the file
    pub row_limit: usize,
    pub label_column: usize,
    pub test_fraction: f64,
    pub split_seed: u64,
    /// Settings shared by both arms; `pool` and `n_jobs` are set per arm
    pub search: SearchConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("HIGGS.csv.gz"),
            row_limit: 1_000_000,
            label_column: 0,
            test_fraction: 0.2,
            split_seed: 12,
            search: SearchConfig::default(),
        }
    }
}

impl BenchmarkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_row_limit(mut self, rows: usize) -> Self {
        self.row_limit = rows;
        self
    }

    pub fn with_label_column(mut self, column: usize) -> Self {
        self.label_column = column;
        self
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    pub fn with_split_seed(mut self, seed: u64) -> Self {
        self.split_seed = seed;
        self
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Load from JSON; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            KolosalError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.row_limit == 0 {
            return Err(KolosalError::invalid_parameter("row_limit", 0, "must be positive"));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(KolosalError::invalid_parameter(
                "test_fraction",
                self.test_fraction,
                "must be strictly between 0 and 1",
            ));
        }
        // Pool-specific checks happen once the arm's config is derived
        self.search
            .clone()
            .with_pool(crate::backend::EstimatorPool::Default)
            .validate()
    }
}
