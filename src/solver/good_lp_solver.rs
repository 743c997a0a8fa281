// good_lp backend
// Buffers declarations into good_lp's modelling types and hands them to the
// selected engine (microlp or COIN-OR CBC) on optimize

use good_lp::solvers::SolutionStatus as EngineStatus;
#[cfg(feature = "coin_cbc")]
use good_lp::solvers::WithTimeLimit;
use good_lp::{
    variable, Constraint as GoodLpConstraint, Expression, ProblemVariables, ResolutionError,
    Solution as GoodLpSolutionTrait, SolverModel, Variable as GoodLpVariable,
};
use tracing::debug;

use super::adapter::{Backend, BackendError, BackendStatus, SessionFactory, SolverAdapter};
use crate::domain::{
    models::{SolverConfig, Variable},
    value_objects::{ConstraintType, OptimizationType, VariableType},
};

/// Engine good_lp dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoodLpEngine {
    #[cfg(feature = "microlp")]
    MicroLp,
    #[cfg(feature = "coin_cbc")]
    CoinCbc,
}

impl GoodLpEngine {
    pub fn name(self) -> &'static str {
        match self {
            #[cfg(feature = "microlp")]
            GoodLpEngine::MicroLp => "microlp",
            #[cfg(feature = "coin_cbc")]
            GoodLpEngine::CoinCbc => "COIN-OR CBC",
        }
    }
}

/// One good_lp problem being assembled for a single solve
pub struct GoodLpBackend {
    engine: GoodLpEngine,
    config: SolverConfig,
    vars: Option<ProblemVariables>,
    objective: Expression,
    sense: OptimizationType,
    constraints: Vec<GoodLpConstraint>,
    solution: Option<Vec<f64>>,
    columns: Vec<GoodLpVariable>,
}

impl GoodLpBackend {
    pub fn new(engine: GoodLpEngine, config: SolverConfig) -> Self {
        Self {
            engine,
            config,
            vars: Some(ProblemVariables::new()),
            objective: 0.into(),
            sense: OptimizationType::Minimize,
            constraints: Vec::new(),
            solution: None,
            columns: Vec::new(),
        }
    }

    /// Record the engine outcome; only a proven optimum keeps its values
    fn finish(
        &mut self,
        outcome: Result<(EngineStatus, Vec<f64>), ResolutionError>,
    ) -> Result<BackendStatus, BackendError> {
        match outcome {
            Ok((EngineStatus::Optimal, values)) => {
                self.solution = Some(values);
                Ok(BackendStatus::Optimal)
            }
            Ok((stopped, _)) => Ok(BackendStatus::Stopped(format!("{:?}", stopped))),
            Err(ResolutionError::Infeasible) => Ok(BackendStatus::Infeasible),
            Err(ResolutionError::Unbounded) => Ok(BackendStatus::Unbounded),
            Err(e) => Err(BackendError(format!("{}: {}", self.engine.name(), e))),
        }
    }

    fn expression(&self, terms: &[(usize, f64)]) -> Expression {
        let mut expr: Expression = 0.into();
        for &(col, coeff) in terms {
            expr += coeff * self.columns[col];
        }
        expr
    }
}

/// Add the constraints to an engine model, solve it and read every column
/// together with the engine's own view of how the search ended
fn solve_model<M>(
    mut model: M,
    constraints: Vec<GoodLpConstraint>,
    columns: &[GoodLpVariable],
) -> Result<(EngineStatus, Vec<f64>), ResolutionError>
where
    M: SolverModel<Error = ResolutionError>,
{
    for constraint in constraints {
        model = model.with(constraint);
    }
    let solution = model.solve()?;
    let values = columns.iter().map(|&c| solution.value(c)).collect();
    Ok((solution.status(), values))
}

impl Backend for GoodLpBackend {
    type Column = usize;

    fn declare_variable(&mut self, var_def: &Variable) -> Result<usize, BackendError> {
        let vars = self
            .vars
            .as_mut()
            .ok_or_else(|| BackendError::new("problem already solved"))?;

        let lower = var_def.lower_bound;
        let upper = var_def.upper_bound.unwrap_or(f64::INFINITY);

        let var = match var_def.variable_type {
            VariableType::Binary | VariableType::Integer => {
                vars.add(variable().integer().min(lower).max(upper))
            }
            VariableType::Continuous => vars.add(variable().min(lower).max(upper)),
        };
        self.columns.push(var);
        Ok(self.columns.len() - 1)
    }

    fn set_objective(&mut self, sense: OptimizationType, terms: &[(usize, f64)]) -> Result<(), BackendError> {
        self.objective = self.expression(terms);
        self.sense = sense;
        Ok(())
    }

    fn add_constraint(
        &mut self,
        _name: &str,
        terms: &[(usize, f64)],
        constraint_type: ConstraintType,
        bound: f64,
    ) -> Result<(), BackendError> {
        let lhs = self.expression(terms);
        let constraint = match constraint_type {
            ConstraintType::LessThanOrEqual => lhs.leq(bound),
            ConstraintType::Equal => lhs.eq(bound),
            ConstraintType::GreaterThanOrEqual => lhs.geq(bound),
        };
        self.constraints.push(constraint);
        Ok(())
    }

    fn optimize(&mut self) -> Result<BackendStatus, BackendError> {
        let vars = self
            .vars
            .take()
            .ok_or_else(|| BackendError::new("problem already solved"))?;
        let objective = std::mem::replace(&mut self.objective, 0.into());
        let constraints = std::mem::take(&mut self.constraints);

        let unsolved = match self.sense {
            OptimizationType::Minimize => vars.minimise(objective),
            OptimizationType::Maximize => vars.maximise(objective),
        };

        let outcome = match self.engine {
            #[cfg(feature = "microlp")]
            GoodLpEngine::MicroLp => {
                if let Some(limit) = self.config.time_limit {
                    debug!(limit, "microlp has no time limit, ignoring");
                }
                solve_model(
                    unsolved.using(good_lp::solvers::microlp::microlp),
                    constraints,
                    &self.columns,
                )
            }
            #[cfg(feature = "coin_cbc")]
            GoodLpEngine::CoinCbc => {
                let mut model = unsolved.using(good_lp::solvers::coin_cbc::coin_cbc);
                if !self.config.verbose {
                    model.set_parameter("log", "0");
                }
                if let Some(limit) = self.config.time_limit {
                    model = model.with_time_limit(limit);
                }
                solve_model(model, constraints, &self.columns)
            }
        };

        self.finish(outcome)
    }

    fn values(&self, columns: &[usize]) -> Result<Vec<f64>, BackendError> {
        let solution = self
            .solution
            .as_ref()
            .ok_or_else(|| BackendError::new("no solution available"))?;
        columns
            .iter()
            .map(|&c| {
                solution
                    .get(c)
                    .copied()
                    .ok_or_else(|| BackendError(format!("unknown column {}", c)))
            })
            .collect()
    }
}

/// Session factory for the good_lp engines
#[derive(Debug, Clone, Copy)]
pub struct GoodLpSessions {
    engine: GoodLpEngine,
}

impl SessionFactory for GoodLpSessions {
    type Backend = GoodLpBackend;

    fn open(&self, config: &SolverConfig) -> Result<GoodLpBackend, BackendError> {
        Ok(GoodLpBackend::new(self.engine, config.clone()))
    }

    fn name(&self) -> &str {
        self.engine.name()
    }

    fn supports_mip(&self) -> bool {
        true
    }
}

pub type GoodLpSolver = SolverAdapter<GoodLpSessions>;

impl GoodLpSolver {
    pub fn with_engine(engine: GoodLpEngine, config: SolverConfig) -> Self {
        SolverAdapter::with_config(GoodLpSessions { engine }, config)
    }

    #[cfg(feature = "microlp")]
    pub fn microlp(config: SolverConfig) -> Self {
        Self::with_engine(GoodLpEngine::MicroLp, config)
    }

    #[cfg(feature = "coin_cbc")]
    pub fn coin_cbc(config: SolverConfig) -> Self {
        Self::with_engine(GoodLpEngine::CoinCbc, config)
    }
}

#[cfg(all(test, feature = "microlp"))]
mod tests {
    use super::*;
    use crate::domain::{Constraint, LinearExpression, Model, Objective, SolutionStatus, SolverService};

    #[test]
    fn test_microlp_solves_small_lp() {
        // max 3x + 2y  s.t.  x + y <= 4, x <= 3
        let mut model = Model::new("small_lp");
        let x = model.add_variable(Variable::continuous("x")).unwrap();
        let y = model.add_variable(Variable::continuous("y")).unwrap();
        model
            .set_objective(Objective::maximize(LinearExpression::new().term(x, 3.0).term(y, 2.0)))
            .unwrap();
        model
            .add_constraint(Constraint::less_equal("capacity", LinearExpression::sum([x, y]), 4.0))
            .unwrap();
        model
            .add_constraint(Constraint::less_equal("x_max", LinearExpression::sum([x]), 3.0))
            .unwrap();

        let result = GoodLpSolver::microlp(SolverConfig::default()).solve(&model).unwrap();
        assert_eq!(result.status(), SolutionStatus::Optimal);
        assert!((result.objective_value().unwrap() - 11.0).abs() < 1e-6);
        assert!((result.value("x").unwrap() - 3.0).abs() < 1e-6);
        assert!((result.value("y").unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_microlp_reports_unbounded() {
        let mut model = Model::new("unbounded");
        let x = model.add_variable(Variable::continuous("x")).unwrap();
        model
            .set_objective(Objective::maximize(LinearExpression::sum([x])))
            .unwrap();

        let result = GoodLpSolver::microlp(SolverConfig::default()).solve(&model).unwrap();
        assert_eq!(result.status(), SolutionStatus::Unbounded);
        assert!(result.values().is_none());
    }

    #[test]
    fn test_microlp_respects_integrality() {
        // max x  s.t.  2x <= 5, x integer
        let mut model = Model::new("integral");
        let x = model.add_variable(Variable::integer("x")).unwrap();
        model
            .set_objective(Objective::maximize(LinearExpression::sum([x])))
            .unwrap();
        model
            .add_constraint(Constraint::less_equal("cap", LinearExpression::new().term(x, 2.0), 5.0))
            .unwrap();

        let result = GoodLpSolver::microlp(SolverConfig::default()).solve(&model).unwrap();
        assert_eq!(result.status(), SolutionStatus::Optimal);
        assert_eq!(result.value("x"), Some(2.0));
    }

    #[test]
    fn test_limit_stops_are_not_optimal() {
        for engine_status in [EngineStatus::TimeLimit, EngineStatus::GapLimit] {
            let mut backend = GoodLpBackend::new(GoodLpEngine::MicroLp, SolverConfig::default());
            let status = backend.finish(Ok((engine_status, vec![1.0]))).unwrap();
            assert!(matches!(status, BackendStatus::Stopped(_)));
            assert!(backend.values(&[0]).is_err());
        }
    }

    #[test]
    fn test_proven_optimum_keeps_values() {
        let mut backend = GoodLpBackend::new(GoodLpEngine::MicroLp, SolverConfig::default());
        let status = backend.finish(Ok((EngineStatus::Optimal, vec![4.0]))).unwrap();
        assert_eq!(status, BackendStatus::Optimal);
        assert_eq!(backend.values(&[0]).unwrap(), vec![4.0]);
    }
}
