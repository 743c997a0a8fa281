// Domain service interface for solving optimization models
// Any solver implementation must follow this contract

use super::models::{Model, SolveResult};

/// Error types raised to the caller.
///
/// Infeasible and unbounded models are not errors: they are reported as
/// [`SolveResult`] statuses, as are backend failures during a solve.
#[derive(Debug, thiserror::Error)]
pub enum OptimizationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model construction failed: {0}")]
    ModelConstruction(String),

    #[error("Solver not available: {0}")]
    SolverUnavailable(String),
}

pub type Result<T> = std::result::Result<T, OptimizationError>;

/// Domain service interface for optimization solvers
///
/// Business logic depends on this trait only, so backends can be swapped
/// without touching the problem builders or the result mapper.
pub trait SolverService: Send + Sync {
    /// Solve a model.
    ///
    /// Returns `Err` only for models that break their own invariants. Every
    /// solver outcome, including backend failures, is an `Ok(SolveResult)`.
    fn solve(&self, model: &Model) -> Result<SolveResult>;

    /// Validate a model without solving it
    fn validate(&self, model: &Model) -> Result<()> {
        model.validate()
    }

    /// Get the name of this solver backend
    fn name(&self) -> &str;

    /// Check if this solver supports mixed-integer programming
    fn supports_mip(&self) -> bool;
}
