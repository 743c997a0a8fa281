// Solver Adapter
// Translates a domain Model into calls against a backend session and maps the
// backend's terminal status back onto SolveResult

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::domain::{
    models::{LinearExpression, Model, SolveResult, SolverConfig, SolverStatistics, Variable},
    solver_service::{Result, SolverService},
    value_objects::{ConstraintType, OptimizationType},
};

/// Largest constraint violation an extracted solution may show without a warning
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Failure reported by a backend while building or solving
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Terminal status reported by a backend after `optimize`
#[derive(Debug, Clone, PartialEq)]
pub enum BackendStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// Any other stop (limits, numerical trouble); carries the backend's reason
    Stopped(String),
}

/// Minimal capability set a solver must offer to be driven by [`SolverAdapter`]
pub trait Backend {
    /// Backend-native handle of a declared variable
    type Column: Copy;

    fn declare_variable(&mut self, variable: &Variable) -> std::result::Result<Self::Column, BackendError>;

    fn set_objective(
        &mut self,
        sense: OptimizationType,
        terms: &[(Self::Column, f64)],
    ) -> std::result::Result<(), BackendError>;

    fn add_constraint(
        &mut self,
        name: &str,
        terms: &[(Self::Column, f64)],
        constraint_type: ConstraintType,
        bound: f64,
    ) -> std::result::Result<(), BackendError>;

    /// Run the solve synchronously and report the terminal status
    fn optimize(&mut self) -> std::result::Result<BackendStatus, BackendError>;

    /// Values of `columns` after an optimal solve
    fn values(&self, columns: &[Self::Column]) -> std::result::Result<Vec<f64>, BackendError>;
}

/// Opens one backend session per solve.
///
/// A session lives for the duration of a single [`SolverService::solve`] call
/// and is dropped when the call returns, whatever the outcome.
pub trait SessionFactory: Send + Sync {
    type Backend: Backend;

    fn open(&self, config: &SolverConfig) -> std::result::Result<Self::Backend, BackendError>;

    fn name(&self) -> &str;

    fn supports_mip(&self) -> bool;
}

/// [`SolverService`] implementation over any [`SessionFactory`]
pub struct SolverAdapter<S> {
    sessions: S,
    config: SolverConfig,
}

impl<S: SessionFactory> SolverAdapter<S> {
    pub fn new(sessions: S) -> Self {
        Self::with_config(sessions, SolverConfig::default())
    }

    pub fn with_config(sessions: S, config: SolverConfig) -> Self {
        Self { sessions, config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn run(&self, model: &Model) -> std::result::Result<SolveResult, BackendError> {
        let mut backend = self.sessions.open(&self.config)?;

        let columns = model
            .variables()
            .iter()
            .map(|v| backend.declare_variable(v))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let terms = |expr: &LinearExpression| -> Vec<(<S::Backend as Backend>::Column, f64)> {
            expr.terms()
                .filter(|&(_, coeff)| coeff != 0.0)
                .map(|(var, coeff)| (columns[var.index()], coeff))
                .collect()
        };

        let objective = model.objective();
        backend.set_objective(objective.optimization_type, &terms(&objective.expression))?;

        for constraint in model.constraints() {
            backend
                .add_constraint(
                    &constraint.name,
                    &terms(&constraint.expression),
                    constraint.constraint_type,
                    constraint.bound,
                )
                .map_err(|e| BackendError(format!("constraint '{}': {}", constraint.name, e)))?;
        }

        debug!(
            model = model.name(),
            variables = columns.len(),
            constraints = model.constraints().len(),
            "model handed to backend"
        );

        match backend.optimize()? {
            BackendStatus::Optimal => {
                let mut values = backend.values(&columns)?;
                if values.len() != columns.len() {
                    return Err(BackendError(format!(
                        "backend returned {} values for {} variables",
                        values.len(),
                        columns.len()
                    )));
                }
                for (value, variable) in values.iter_mut().zip(model.variables()) {
                    if variable.is_integer() {
                        *value = value.round();
                    }
                }

                let objective_value = objective.expression.evaluate(&values);
                let named: BTreeMap<String, f64> = model
                    .variables()
                    .iter()
                    .zip(&values)
                    .map(|(v, &x)| (v.name.clone(), x))
                    .collect();

                Ok(SolveResult::optimal(objective_value, named)
                    .with_message(format!("Optimal solution found for '{}'", model.name())))
            }
            BackendStatus::Infeasible => Ok(SolveResult::infeasible(
                "Problem is infeasible: no solution satisfies all constraints",
            )),
            BackendStatus::Unbounded => Ok(SolveResult::unbounded(
                "Problem is unbounded: objective can be improved infinitely",
            )),
            BackendStatus::Stopped(reason) => Ok(SolveResult::error(format!(
                "{} stopped without an optimal solution: {}",
                self.sessions.name(),
                reason
            ))),
        }
    }
}

impl<S: SessionFactory> SolverService for SolverAdapter<S> {
    fn solve(&self, model: &Model) -> Result<SolveResult> {
        // Validate first
        self.validate(model)?;

        let start_time = Instant::now();
        let result = match self.run(model) {
            Ok(result) => result,
            Err(e) => {
                warn!(solver = self.name(), model = model.name(), error = %e, "backend failure");
                SolveResult::error(format!("{} failed: {}", self.name(), e))
            }
        };
        let solve_time = start_time.elapsed().as_secs_f64() * 1000.0;

        let max_constraint_violation = match result.values() {
            Some(named) => {
                let values: Vec<f64> = model
                    .variables()
                    .iter()
                    .map(|v| named.get(&v.name).copied().unwrap_or(0.0))
                    .collect();
                model.max_violation(&values)
            }
            None => 0.0,
        };

        let result = if max_constraint_violation > FEASIBILITY_TOLERANCE {
            warn!(
                solver = self.name(),
                model = model.name(),
                violation = max_constraint_violation,
                "extracted solution violates constraints"
            );
            let message = format!(
                "{} (constraints violated by up to {:.3e} after rounding)",
                result.message(),
                max_constraint_violation
            );
            result.with_message(message)
        } else {
            result
        };

        let statistics = SolverStatistics {
            backend: self.name().to_string(),
            solve_time_ms: solve_time,
            num_variables: model.num_variables() as u32,
            num_constraints: model.constraints().len() as u32,
            num_integer_vars: (model.num_integer_variables() - model.num_binary_variables()) as u32,
            num_binary_vars: model.num_binary_variables() as u32,
            max_constraint_violation,
        };

        info!(
            solver = self.name(),
            model = model.name(),
            status = %result.status(),
            objective = ?result.objective_value(),
            elapsed_ms = solve_time,
            "solve finished"
        );

        Ok(result.with_statistics(statistics))
    }

    fn name(&self) -> &str {
        self.sessions.name()
    }

    fn supports_mip(&self) -> bool {
        self.sessions.supports_mip()
    }
}
