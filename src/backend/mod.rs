//! Estimator backends and configuration dictionaries
//!
//! A backend owns one estimator pool: the operators a search may pick
//! from and the code that instantiates them. The CPU backend is always
//! present. GPU backends are external collaborators that callers
//! register; with none registered, the GPU pool is unsupported.

mod dictionary;

pub use dictionary::{ConfigDictionary, EstimatorChoice, ParamRange};

use crate::error::{KolosalError, Result};
use crate::estimators::{Classifier, EstimatorSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Which estimator pool a search draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorPool {
    /// Native CPU estimators
    Default,
    /// GPU-accelerated estimators from a registered backend
    Gpu,
}

impl EstimatorPool {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimatorPool::Default => "default",
            EstimatorPool::Gpu => "gpu",
        }
    }
}

impl fmt::Display for EstimatorPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EstimatorPool {
    type Err = KolosalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" | "cpu" => Ok(EstimatorPool::Default),
            "gpu" | "cuda" => Ok(EstimatorPool::Gpu),
            other => Err(KolosalError::invalid_parameter("pool", other, "expected `default` or `gpu`")),
        }
    }
}

/// A source of estimators for one pool
pub trait EstimatorBackend: Send + Sync {
    /// Short identifier used in reports
    fn name(&self) -> &str;

    fn pool(&self) -> EstimatorPool;

    /// `Ok(())` when the backend can run in this environment
    fn availability(&self) -> Result<()>;

    /// Operators the search may choose from
    fn operators(&self) -> ConfigDictionary;

    /// Instantiate an unfitted classifier for `spec`
    fn build(&self, spec: &EstimatorSpec, seed: u64) -> Result<Box<dyn Classifier>>;
}

/// The native pool: every estimator in [`crate::estimators`]
#[derive(Debug, Clone, Default)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

impl EstimatorBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu-native"
    }

    fn pool(&self) -> EstimatorPool {
        EstimatorPool::Default
    }

    fn availability(&self) -> Result<()> {
        Ok(())
    }

    fn operators(&self) -> ConfigDictionary {
        ConfigDictionary::default_pool()
    }

    fn build(&self, spec: &EstimatorSpec, seed: u64) -> Result<Box<dyn Classifier>> {
        Ok(spec.build(seed))
    }
}

/// Backends keyed by the pool they serve
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<EstimatorPool, Arc<dyn EstimatorBackend>>,
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self
            .backends
            .iter()
            .map(|(pool, b)| format!("{}={}", pool, b.name()))
            .collect();
        names.sort();
        f.debug_struct("BackendRegistry").field("backends", &names).finish()
    }
}

impl BackendRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the CPU backend only
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CpuBackend::new()));
        registry
    }

    /// Register (or replace) the backend for its pool
    pub fn register(&mut self, backend: Arc<dyn EstimatorBackend>) -> &mut Self {
        debug!(pool = %backend.pool(), backend = backend.name(), "registered estimator backend");
        self.backends.insert(backend.pool(), backend);
        self
    }

    pub fn contains(&self, pool: EstimatorPool) -> bool {
        self.backends.contains_key(&pool)
    }

    pub fn backend_name(&self, pool: EstimatorPool) -> Option<String> {
        self.backends.get(&pool).map(|b| b.name().to_string())
    }

    /// Backend for `pool`, checked for availability.
    ///
    /// No substitution happens: a missing or unusable GPU backend is an
    /// error even though a CPU backend exists.
    pub fn resolve(&self, pool: EstimatorPool) -> Result<Arc<dyn EstimatorBackend>> {
        let backend = self.backends.get(&pool).ok_or_else(|| {
            KolosalError::ConfigurationUnsupported(format!(
                "no estimator backend for the `{}` pool is available in this build",
                pool
            ))
        })?;

        backend.availability().map_err(|e| match e {
            KolosalError::ConfigurationUnsupported(_) => e,
            other => KolosalError::ConfigurationUnsupported(format!(
                "backend `{}` for the `{}` pool is unusable: {}",
                backend.name(),
                pool,
                other
            )),
        })?;

        Ok(Arc::clone(backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OfflineGpu;

    impl EstimatorBackend for OfflineGpu {
        fn name(&self) -> &str {
            "offline-gpu"
        }

        fn pool(&self) -> EstimatorPool {
            EstimatorPool::Gpu
        }

        fn availability(&self) -> Result<()> {
            Err(KolosalError::DataError("no device".to_string()))
        }

        fn operators(&self) -> ConfigDictionary {
            ConfigDictionary::gpu_pool()
        }

        fn build(&self, spec: &EstimatorSpec, seed: u64) -> Result<Box<dyn Classifier>> {
            Ok(spec.build(seed))
        }
    }

    #[test]
    fn test_pool_parse_and_display() {
        assert_eq!("GPU".parse::<EstimatorPool>().unwrap(), EstimatorPool::Gpu);
        assert_eq!("cpu".parse::<EstimatorPool>().unwrap(), EstimatorPool::Default);
        assert!("tpu".parse::<EstimatorPool>().is_err());
        assert_eq!(EstimatorPool::Default.to_string(), "default");
    }

    #[test]
    fn test_defaults_resolve_cpu_only() {
        let registry = BackendRegistry::with_defaults();
        assert!(registry.resolve(EstimatorPool::Default).is_ok());

        let err = registry.resolve(EstimatorPool::Gpu).err().unwrap();
        assert!(matches!(err, KolosalError::ConfigurationUnsupported(_)));
    }

    #[test]
    fn test_unavailable_backend_is_unsupported() {
        let mut registry = BackendRegistry::with_defaults();
        registry.register(Arc::new(OfflineGpu));
        assert!(registry.contains(EstimatorPool::Gpu));

        let err = registry.resolve(EstimatorPool::Gpu).err().unwrap();
        assert!(matches!(err, KolosalError::ConfigurationUnsupported(ref m) if m.contains("no device")));
    }
}
