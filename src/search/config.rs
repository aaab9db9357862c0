//! Search configuration

use crate::backend::EstimatorPool;
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};

/// Settings for one pipeline search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of generations after the initial population
    pub generations: usize,
    pub population_size: usize,
    /// Children per generation; `None` means `population_size`
    pub offspring_size: Option<usize>,
    pub cv_folds: usize,
    /// Worker threads, `-1` for all cores
    pub n_jobs: i32,
    pub random_state: u64,
    pub pool: EstimatorPool,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    /// 0 silent, 1 summary, 2 per-generation progress, 3 per-pipeline detail
    pub verbosity: u8,
    /// Cap on training rows used by each cross-validation fit
    pub max_eval_rows: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            generations: 5,
            population_size: 20,
            offspring_size: None,
            cv_folds: 5,
            n_jobs: -1,
            random_state: 12,
            pool: EstimatorPool::Default,
            mutation_rate: 0.9,
            crossover_rate: 0.1,
            verbosity: 2,
            max_eval_rows: None,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default settings for `pool`, with the pool's `n_jobs` requirement applied
    pub fn for_pool(pool: EstimatorPool) -> Self {
        Self::default().with_pool(pool)
    }

    /// Copy targeting `pool`. A GPU pool is pinned to one job.
    pub fn with_pool(mut self, pool: EstimatorPool) -> Self {
        self.pool = pool;
        if pool == EstimatorPool::Gpu {
            self.n_jobs = 1;
        }
        self
    }

    pub fn with_generations(mut self, generations: usize) -> Self {
        self.generations = generations;
        self
    }

    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    pub fn with_offspring_size(mut self, size: usize) -> Self {
        self.offspring_size = Some(size);
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: i32) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_rates(mut self, mutation_rate: f64, crossover_rate: f64) -> Self {
        self.mutation_rate = mutation_rate;
        self.crossover_rate = crossover_rate;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_max_eval_rows(mut self, rows: usize) -> Self {
        self.max_eval_rows = Some(rows);
        self
    }

    pub fn offspring(&self) -> usize {
        self.offspring_size.unwrap_or(self.population_size)
    }

    /// Threads to give the evaluation pool
    pub fn threads(&self) -> usize {
        if self.n_jobs < 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            self.n_jobs as usize
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.generations == 0 {
            return Err(KolosalError::invalid_parameter("generations", self.generations, "must be at least 1"));
        }
        if self.population_size < 2 {
            return Err(KolosalError::invalid_parameter(
                "population_size",
                self.population_size,
                "must be at least 2",
            ));
        }
        if self.offspring() == 0 {
            return Err(KolosalError::invalid_parameter("offspring_size", 0, "must be at least 1"));
        }
        if self.cv_folds < 2 {
            return Err(KolosalError::invalid_parameter("cv_folds", self.cv_folds, "must be at least 2"));
        }
        if self.n_jobs == 0 || self.n_jobs < -1 {
            return Err(KolosalError::invalid_parameter("n_jobs", self.n_jobs, "must be -1 or positive"));
        }
        if self.pool == EstimatorPool::Gpu && self.n_jobs != 1 {
            return Err(KolosalError::invalid_parameter(
                "n_jobs",
                self.n_jobs,
                "the gpu pool runs with exactly one job",
            ));
        }
        for (name, rate) in [("mutation_rate", self.mutation_rate), ("crossover_rate", self.crossover_rate)] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(KolosalError::invalid_parameter(name, rate, "must be within [0, 1]"));
            }
        }
        if self.mutation_rate + self.crossover_rate > 1.0 + 1e-12 {
            return Err(KolosalError::invalid_parameter(
                "mutation_rate",
                self.mutation_rate,
                "mutation_rate + crossover_rate must not exceed 1",
            ));
        }
        if self.mutation_rate + self.crossover_rate <= 0.0 {
            return Err(KolosalError::invalid_parameter(
                "mutation_rate",
                self.mutation_rate,
                "mutation_rate + crossover_rate must be positive",
            ));
        }
        if self.verbosity > 3 {
            return Err(KolosalError::invalid_parameter("verbosity", self.verbosity, "must be within 0..=3"));
        }
        if self.max_eval_rows == Some(0) {
            return Err(KolosalError::invalid_parameter("max_eval_rows", 0, "must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SearchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.offspring(), 20);
        assert_eq!(config.generations, 5);
        assert_eq!(config.random_state, 12);
    }

    #[test]
    fn test_gpu_pool_pins_single_job() {
        let config = SearchConfig::default().with_n_jobs(-1).with_pool(EstimatorPool::Gpu);
        assert_eq!(config.n_jobs, 1);
        assert!(config.validate().is_ok());

        let forced = config.with_n_jobs(4);
        assert!(matches!(
            forced.validate(),
            Err(KolosalError::InvalidParameter { ref name, .. }) if name == "n_jobs"
        ));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(SearchConfig::default().with_generations(0).validate().is_err());
        assert!(SearchConfig::default().with_population_size(1).validate().is_err());
        assert!(SearchConfig::default().with_cv_folds(1).validate().is_err());
        assert!(SearchConfig::default().with_n_jobs(0).validate().is_err());
        assert!(SearchConfig::default().with_n_jobs(-2).validate().is_err());
        assert!(SearchConfig::default().with_rates(0.8, 0.4).validate().is_err());
        assert!(SearchConfig::default().with_rates(1.2, 0.0).validate().is_err());
        assert!(SearchConfig::default().with_verbosity(4).validate().is_err());
    }

    #[test]
    fn test_threads() {
        assert_eq!(SearchConfig::default().with_n_jobs(3).threads(), 3);
        assert!(SearchConfig::default().threads() >= 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SearchConfig = serde_json::from_str(r#"{"generations": 2, "pool": "gpu", "n_jobs": 1}"#).unwrap();
        assert_eq!(config.generations, 2);
        assert_eq!(config.pool, EstimatorPool::Gpu);
        assert_eq!(config.population_size, 20);
    }
}
