use std::sync::Arc;

use tracing::debug;

use crate::domain::{
    models::SolverConfig,
    solver_service::{OptimizationError, Result, SolverService},
    value_objects::SolverBackend,
};

#[cfg(any(feature = "microlp", feature = "coin_cbc"))]
use crate::solver::GoodLpSolver;
#[cfg(feature = "highs")]
use crate::solver::HighsSolver;

/// Factory for creating solver instances based on configuration
pub struct SolverFactory;

impl SolverFactory {
    /// Create the solver named by `config.backend`
    pub fn create(config: &SolverConfig) -> Result<Arc<dyn SolverService>> {
        let backend = Self::resolve(config.backend)?;
        debug!(requested = %config.backend, selected = %backend, "creating solver");

        match backend {
            #[cfg(feature = "highs")]
            SolverBackend::Highs => Ok(Arc::new(HighsSolver::highs(config.clone()))),
            #[cfg(feature = "coin_cbc")]
            SolverBackend::CoinCbc => Ok(Arc::new(GoodLpSolver::coin_cbc(config.clone()))),
            #[cfg(feature = "microlp")]
            SolverBackend::MicroLp => Ok(Arc::new(GoodLpSolver::microlp(config.clone()))),
            other => Err(Self::unavailable(other)),
        }
    }

    /// Create a solver for a specific backend with default settings
    pub fn create_from_backend(backend: SolverBackend) -> Result<Arc<dyn SolverService>> {
        Self::create(&SolverConfig {
            backend,
            ..SolverConfig::default()
        })
    }

    /// Get the default solver (best compiled-in backend)
    pub fn default_solver() -> Result<Arc<dyn SolverService>> {
        Self::create(&SolverConfig::default())
    }

    /// Backends compiled into this build, in `Auto` preference order
    pub fn available() -> Vec<SolverBackend> {
        let mut backends = Vec::new();
        if cfg!(feature = "highs") {
            backends.push(SolverBackend::Highs);
        }
        if cfg!(feature = "coin_cbc") {
            backends.push(SolverBackend::CoinCbc);
        }
        if cfg!(feature = "microlp") {
            backends.push(SolverBackend::MicroLp);
        }
        backends
    }

    fn resolve(backend: SolverBackend) -> Result<SolverBackend> {
        match backend {
            SolverBackend::Auto => Self::available().into_iter().next().ok_or_else(|| {
                OptimizationError::SolverUnavailable(
                    "no solver backend compiled in (enable `microlp`, `coin_cbc` or `highs`)".to_string(),
                )
            }),
            other if Self::available().contains(&other) => Ok(other),
            other => Err(Self::unavailable(other)),
        }
    }

    fn unavailable(backend: SolverBackend) -> OptimizationError {
        OptimizationError::SolverUnavailable(format!("{} is not compiled into this build", backend))
    }
}
