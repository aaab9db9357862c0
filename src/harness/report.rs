//! Benchmark reports

use crate::backend::{BackendRegistry, EstimatorPool};
use crate::error::Result;
use crate::pipeline::PipelineSpec;
use crate::search::{GenerationSummary, SearchConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use sysinfo::System;

/// Outcome of one arm: a search plus held-out evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmReport {
    pub pool: EstimatorPool,
    pub backend: String,
    pub n_jobs: i32,
    /// Held-out accuracy of the best pipeline
    pub accuracy: f64,
    /// Wall-clock seconds for search plus evaluation
    pub elapsed_secs: f64,
    pub best_pipeline: String,
    pub best_spec: PipelineSpec,
    pub best_cv_score: f64,
    pub evaluated_pipelines: usize,
    pub generations: Vec<GenerationSummary>,
}

/// Host the benchmark ran on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareSummary {
    pub cpu_brand: String,
    pub logical_cores: usize,
    pub total_memory_gb: f64,
    pub os: Option<String>,
    /// Registered GPU backend, if any
    pub gpu_backend: Option<String>,
}

impl HardwareSummary {
    pub fn detect(registry: &BackendRegistry) -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        Self {
            cpu_brand: sys
                .cpus()
                .first()
                .map(|c| c.brand().trim().to_string())
                .unwrap_or_default(),
            logical_cores: sys.cpus().len(),
            total_memory_gb: sys.total_memory() as f64 / 1024.0 / 1024.0 / 1024.0,
            os: System::long_os_version(),
            gpu_backend: registry.backend_name(EstimatorPool::Gpu),
        }
    }
}

/// Both arms side by side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub timestamp: DateTime<Utc>,
    pub data_path: String,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    /// Base settings shared by the arms
    pub search: SearchConfig,
    /// In execution order
    pub arms: Vec<ArmReport>,
    pub hardware: HardwareSummary,
}

impl ComparisonReport {
    pub fn arm(&self, pool: EstimatorPool) -> Option<&ArmReport> {
        self.arms.iter().find(|a| a.pool == pool)
    }

    /// CPU seconds over GPU seconds; needs both arms
    pub fn speedup(&self) -> Option<f64> {
        let gpu = self.arm(EstimatorPool::Gpu)?;
        let cpu = self.arm(EstimatorPool::Default)?;
        (gpu.elapsed_secs > 0.0).then(|| cpu.elapsed_secs / gpu.elapsed_secs)
    }

    /// GPU accuracy minus CPU accuracy; needs both arms
    pub fn accuracy_delta(&self) -> Option<f64> {
        let gpu = self.arm(EstimatorPool::Gpu)?;
        let cpu = self.arm(EstimatorPool::Default)?;
        Some(gpu.accuracy - cpu.accuracy)
    }

    pub fn to_json(&self) -> Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.insert("speedup".to_string(), serde_json::json!(self.speedup()));
            map.insert("accuracy_delta".to_string(), serde_json::json!(self.accuracy_delta()));
        }
        Ok(serde_json::to_string_pretty(&value)?)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::EstimatorSpec;

    fn arm(pool: EstimatorPool, accuracy: f64, elapsed_secs: f64) -> ArmReport {
        let spec = PipelineSpec::new(EstimatorSpec::GaussianNb { var_smoothing: 1e-9 });
        ArmReport {
            pool,
            backend: pool.to_string(),
            n_jobs: 1,
            accuracy,
            elapsed_secs,
            best_pipeline: spec.describe(),
            best_spec: spec,
            best_cv_score: accuracy,
            evaluated_pipelines: 4,
            generations: Vec::new(),
        }
    }

    fn report(arms: Vec<ArmReport>) -> ComparisonReport {
        ComparisonReport {
            timestamp: Utc::now(),
            data_path: "HIGGS.csv.gz".to_string(),
            n_train: 80,
            n_test: 20,
            n_features: 28,
            search: SearchConfig::default(),
            arms,
            hardware: HardwareSummary {
                cpu_brand: "test".to_string(),
                logical_cores: 4,
                total_memory_gb: 8.0,
                os: None,
                gpu_backend: None,
            },
        }
    }

    #[test]
    fn test_speedup_and_delta() {
        let r = report(vec![arm(EstimatorPool::Gpu, 0.72, 2.0), arm(EstimatorPool::Default, 0.70, 10.0)]);
        assert!((r.speedup().unwrap() - 5.0).abs() < 1e-12);
        assert!((r.accuracy_delta().unwrap() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_single_arm_has_no_ratio() {
        let r = report(vec![arm(EstimatorPool::Default, 0.7, 1.0)]);
        assert!(r.speedup().is_none());
        assert!(r.accuracy_delta().is_none());
    }

    #[test]
    fn test_json_includes_derived_fields() {
        let r = report(vec![arm(EstimatorPool::Gpu, 0.8, 1.0), arm(EstimatorPool::Default, 0.8, 3.0)]);
        let value: serde_json::Value = serde_json::from_str(&r.to_json().unwrap()).unwrap();
        assert_eq!(value["speedup"], serde_json::json!(3.0));
        assert_eq!(value["arms"][0]["pool"], "gpu");
    }
}
