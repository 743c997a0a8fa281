use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use super::solver_service::{OptimizationError, Result};
use super::value_objects::{ConstraintType, OptimizationType, SolutionStatus, SolverBackend, VariableType};

static NEXT_MODEL_KEY: AtomicU64 = AtomicU64::new(0);

/// Handle of a variable inside the [`Model`] that declared it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId {
    model: u64,
    index: usize,
}

impl VariableId {
    pub fn index(self) -> usize {
        self.index
    }
}

/// Decision variable in an optimization problem
#[derive(Debug, Clone)]
pub struct Variable {
    pub variable_type: VariableType,
    pub lower_bound: f64,
    pub upper_bound: Option<f64>,
    pub name: String,
}

impl Variable {
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Continuous,
            lower_bound: 0.0,
            upper_bound: None,
            name: name.into(),
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Integer,
            lower_bound: 0.0,
            upper_bound: None,
            name: name.into(),
        }
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Binary,
            lower_bound: 0.0,
            upper_bound: Some(1.0),
            name: name.into(),
        }
    }

    pub fn with_bounds(mut self, lower: f64, upper: Option<f64>) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    pub fn is_integer(&self) -> bool {
        self.variable_type.is_integral()
    }

    fn check(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(OptimizationError::ModelConstruction(
                "variable name must not be blank".to_string(),
            ));
        }
        if !self.lower_bound.is_finite() || self.lower_bound < 0.0 {
            return Err(OptimizationError::ModelConstruction(format!(
                "variable '{}' has invalid lower bound {} (must be finite and >= 0)",
                self.name, self.lower_bound
            )));
        }
        if let Some(upper) = self.upper_bound {
            if upper.is_nan() || self.lower_bound > upper {
                return Err(OptimizationError::ModelConstruction(format!(
                    "variable '{}' has lower bound ({}) > upper bound ({})",
                    self.name, self.lower_bound, upper
                )));
            }
        }
        if self.variable_type == VariableType::Binary && self.upper_bound.map_or(true, |u| u > 1.0) {
            return Err(OptimizationError::ModelConstruction(format!(
                "binary variable '{}' must be bounded by 1",
                self.name
            )));
        }
        Ok(())
    }
}

/// Weighted sum of variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpression {
    terms: BTreeMap<VariableId, f64>,
}

impl LinearExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unit-coefficient sum of `vars`; repeated variables accumulate
    pub fn sum(vars: impl IntoIterator<Item = VariableId>) -> Self {
        vars.into_iter().map(|v| (v, 1.0)).collect()
    }

    pub fn term(mut self, var: VariableId, coefficient: f64) -> Self {
        self.add_term(var, coefficient);
        self
    }

    pub fn add_term(&mut self, var: VariableId, coefficient: f64) {
        *self.terms.entry(var).or_insert(0.0) += coefficient;
    }

    pub fn coefficient(&self, var: VariableId) -> f64 {
        self.terms.get(&var).copied().unwrap_or(0.0)
    }

    pub fn terms(&self) -> impl Iterator<Item = (VariableId, f64)> + '_ {
        self.terms.iter().map(|(&v, &c)| (v, c))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Value of the expression for `values` indexed by [`VariableId::index`]
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values.get(v.index()).copied().unwrap_or(0.0))
            .sum()
    }
}

impl FromIterator<(VariableId, f64)> for LinearExpression {
    fn from_iter<I: IntoIterator<Item = (VariableId, f64)>>(iter: I) -> Self {
        let mut expr = LinearExpression::new();
        for (var, coefficient) in iter {
            expr.add_term(var, coefficient);
        }
        expr
    }
}

/// Objective function to minimize or maximize
#[derive(Debug, Clone)]
pub struct Objective {
    pub optimization_type: OptimizationType,
    pub expression: LinearExpression,
}

impl Objective {
    pub fn minimize(expression: LinearExpression) -> Self {
        Self {
            optimization_type: OptimizationType::Minimize,
            expression,
        }
    }

    pub fn maximize(expression: LinearExpression) -> Self {
        Self {
            optimization_type: OptimizationType::Maximize,
            expression,
        }
    }
}

/// Linear constraint on variables
#[derive(Debug, Clone)]
pub struct Constraint {
    pub constraint_type: ConstraintType,
    pub expression: LinearExpression,
    pub bound: f64,
    pub name: String,
}

impl Constraint {
    pub fn new(
        name: impl Into<String>,
        expression: LinearExpression,
        constraint_type: ConstraintType,
        bound: f64,
    ) -> Self {
        Self {
            constraint_type,
            expression,
            bound,
            name: name.into(),
        }
    }

    pub fn less_equal(name: impl Into<String>, expression: LinearExpression, bound: f64) -> Self {
        Self::new(name, expression, ConstraintType::LessThanOrEqual, bound)
    }

    pub fn greater_equal(name: impl Into<String>, expression: LinearExpression, bound: f64) -> Self {
        Self::new(name, expression, ConstraintType::GreaterThanOrEqual, bound)
    }

    pub fn equal(name: impl Into<String>, expression: LinearExpression, bound: f64) -> Self {
        Self::new(name, expression, ConstraintType::Equal, bound)
    }

    /// Amount by which `values` break this constraint (0 when satisfied)
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expression.evaluate(values);
        match self.constraint_type {
            ConstraintType::LessThanOrEqual => (lhs - self.bound).max(0.0),
            ConstraintType::GreaterThanOrEqual => (self.bound - lhs).max(0.0),
            ConstraintType::Equal => (lhs - self.bound).abs(),
        }
    }
}

/// Solver-agnostic optimization problem.
///
/// The model exclusively owns its variables, objective and constraints. Every
/// variable referenced by the objective or a constraint must have been declared
/// through [`Model::add_variable`] on the same model.
#[derive(Debug, Clone)]
pub struct Model {
    key: u64,
    name: String,
    variables: Vec<Variable>,
    variable_ids: HashMap<String, VariableId>,
    objective: Objective,
    constraints: Vec<Constraint>,
    constraint_names: HashSet<String>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            key: NEXT_MODEL_KEY.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            variables: Vec::new(),
            variable_ids: HashMap::new(),
            objective: Objective::minimize(LinearExpression::new()),
            constraints: Vec::new(),
            constraint_names: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_variable(&mut self, variable: Variable) -> Result<VariableId> {
        variable.check()?;
        if self.variable_ids.contains_key(&variable.name) {
            return Err(OptimizationError::ModelConstruction(format!(
                "variable '{}' declared twice",
                variable.name
            )));
        }
        let id = VariableId {
            model: self.key,
            index: self.variables.len(),
        };
        self.variable_ids.insert(variable.name.clone(), id);
        self.variables.push(variable);
        Ok(id)
    }

    pub fn set_objective(&mut self, objective: Objective) -> Result<()> {
        self.check_expression("objective", &objective.expression)?;
        self.objective = objective;
        Ok(())
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<()> {
        if constraint.name.trim().is_empty() {
            return Err(OptimizationError::ModelConstruction(
                "constraint name must not be blank".to_string(),
            ));
        }
        if self.constraint_names.contains(&constraint.name) {
            return Err(OptimizationError::ModelConstruction(format!(
                "constraint '{}' declared twice",
                constraint.name
            )));
        }
        if !constraint.bound.is_finite() {
            return Err(OptimizationError::ModelConstruction(format!(
                "constraint '{}' has non-finite bound {}",
                constraint.name, constraint.bound
            )));
        }
        self.check_expression(&constraint.name, &constraint.expression)?;
        self.constraint_names.insert(constraint.name.clone());
        self.constraints.push(constraint);
        Ok(())
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        if id.model != self.key {
            return None;
        }
        self.variables.get(id.index)
    }

    pub fn variable_id(&self, name: &str) -> Option<VariableId> {
        self.variable_ids.get(name).copied()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_integer_variables(&self) -> usize {
        self.variables.iter().filter(|v| v.is_integer()).count()
    }

    pub fn num_binary_variables(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.variable_type == VariableType::Binary)
            .count()
    }

    pub fn is_mixed_integer(&self) -> bool {
        self.num_integer_variables() > 0
    }

    /// Re-check every invariant of the model
    pub fn validate(&self) -> Result<()> {
        for variable in &self.variables {
            variable.check()?;
        }
        self.check_expression("objective", &self.objective.expression)?;
        for constraint in &self.constraints {
            self.check_expression(&constraint.name, &constraint.expression)?;
        }
        Ok(())
    }

    /// Largest constraint violation for `values` indexed by [`VariableId::index`]
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        self.constraints
            .iter()
            .map(|c| c.violation(values))
            .fold(0.0, f64::max)
    }

    fn check_expression(&self, owner: &str, expression: &LinearExpression) -> Result<()> {
        for (var, coefficient) in expression.terms() {
            if var.model != self.key || var.index >= self.variables.len() {
                return Err(OptimizationError::ModelConstruction(format!(
                    "'{}' references variable #{} which is not declared in model '{}'",
                    owner,
                    var.index(),
                    self.name
                )));
            }
            if !coefficient.is_finite() {
                return Err(OptimizationError::ModelConstruction(format!(
                    "'{}' has non-finite coefficient {} for variable '{}'",
                    owner,
                    coefficient,
                    self.variables[var.index()].name
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for the solver
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub backend: SolverBackend,
    /// Wall-clock limit in seconds, forwarded to backends that support it
    pub time_limit: Option<f64>,
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverBackend::Auto,
            time_limit: None,
            verbose: false,
        }
    }
}

impl SolverConfig {
    pub const BACKEND_VAR: &'static str = "LETSPLAN_SOLVER";
    pub const TIME_LIMIT_VAR: &'static str = "LETSPLAN_TIME_LIMIT";
    pub const VERBOSE_VAR: &'static str = "LETSPLAN_VERBOSE";

    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from a key lookup; unusable values keep the default
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(Self::BACKEND_VAR) {
            match raw.parse::<SolverBackend>() {
                Ok(backend) => config.backend = backend,
                Err(e) => tracing::warn!("ignoring {}: {}", Self::BACKEND_VAR, e),
            }
        }

        if let Some(raw) = lookup(Self::TIME_LIMIT_VAR) {
            match raw.trim().parse::<f64>() {
                Ok(seconds) if seconds.is_finite() && seconds > 0.0 => {
                    config.time_limit = Some(seconds)
                }
                _ => tracing::warn!("ignoring {}: '{}' is not a positive number", Self::TIME_LIMIT_VAR, raw),
            }
        }

        if let Some(raw) = lookup(Self::VERBOSE_VAR) {
            config.verbose = matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }

        config
    }
}

/// Statistics about the solve process
#[derive(Debug, Clone, Default)]
pub struct SolverStatistics {
    pub backend: String,
    pub solve_time_ms: f64,
    pub num_variables: u32,
    pub num_constraints: u32,
    pub num_integer_vars: u32,
    pub num_binary_vars: u32,
    pub max_constraint_violation: f64,
}

/// Outcome of one solve.
///
/// The objective value and the variable values are present iff the status is
/// [`SolutionStatus::Optimal`].
#[derive(Debug, Clone)]
pub struct SolveResult {
    status: SolutionStatus,
    objective_value: Option<f64>,
    values: Option<BTreeMap<String, f64>>,
    message: String,
    statistics: SolverStatistics,
}

impl SolveResult {
    pub fn optimal(objective_value: f64, values: BTreeMap<String, f64>) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            objective_value: Some(objective_value),
            values: Some(values),
            message: "Optimal solution found".to_string(),
            statistics: SolverStatistics::default(),
        }
    }

    pub fn infeasible(message: impl Into<String>) -> Self {
        Self::without_values(SolutionStatus::Infeasible, message)
    }

    pub fn unbounded(message: impl Into<String>) -> Self {
        Self::without_values(SolutionStatus::Unbounded, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::without_values(SolutionStatus::Error, message)
    }

    fn without_values(status: SolutionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            objective_value: None,
            values: None,
            message: message.into(),
            statistics: SolverStatistics::default(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_statistics(mut self, statistics: SolverStatistics) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn status(&self) -> SolutionStatus {
        self.status
    }

    pub fn objective_value(&self) -> Option<f64> {
        self.objective_value
    }

    pub fn values(&self) -> Option<&BTreeMap<String, f64>> {
        self.values.as_ref()
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.as_ref().and_then(|v| v.get(name).copied())
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn statistics(&self) -> &SolverStatistics {
        &self.statistics
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_var_model() -> (Model, VariableId, VariableId) {
        let mut model = Model::new("test");
        let x = model.add_variable(Variable::continuous("x")).unwrap();
        let y = model.add_variable(Variable::binary("y")).unwrap();
        (model, x, y)
    }

    #[test]
    fn test_linear_expression_accumulates_repeated_terms() {
        let (_, x, y) = two_var_model();
        let expr = LinearExpression::sum([x, y, x]);
        assert_eq!(expr.len(), 2);
        assert_eq!(expr.coefficient(x), 2.0);
        assert_eq!(expr.coefficient(y), 1.0);
        assert_eq!(expr.evaluate(&[3.0, 1.0]), 7.0);
    }

    #[test]
    fn test_add_variable_rejects_duplicates_and_blank_names() {
        let (mut model, _, _) = two_var_model();
        assert!(matches!(
            model.add_variable(Variable::continuous("x")),
            Err(OptimizationError::ModelConstruction(_))
        ));
        assert!(model.add_variable(Variable::integer("  ")).is_err());
        assert_eq!(model.num_variables(), 2);
        assert_eq!(model.variable_id("y").map(VariableId::index), Some(1));
    }

    #[test]
    fn test_add_variable_rejects_inconsistent_bounds() {
        let mut model = Model::new("bounds");
        assert!(model
            .add_variable(Variable::continuous("x").with_bounds(5.0, Some(1.0)))
            .is_err());
        assert!(model
            .add_variable(Variable::continuous("neg").with_bounds(-1.0, None))
            .is_err());
        assert!(model
            .add_variable(Variable::binary("b").with_bounds(0.0, None))
            .is_err());
    }

    #[test]
    fn test_dangling_variable_reference_is_rejected() {
        let (mut other, _, _) = two_var_model();
        let foreign = other.add_variable(Variable::continuous("z")).unwrap();

        let (mut model, x, _) = two_var_model();
        let err = model
            .add_constraint(Constraint::less_equal("c", LinearExpression::sum([x, foreign]), 1.0))
            .unwrap_err();
        assert!(matches!(err, OptimizationError::ModelConstruction(_)));
        assert!(model.constraints().is_empty());

        assert!(model
            .set_objective(Objective::minimize(LinearExpression::sum([foreign])))
            .is_err());
    }

    #[test]
    fn test_foreign_id_with_in_range_index_is_rejected() {
        let mut other = Model::new("other");
        let foreign = other.add_variable(Variable::continuous("z")).unwrap();
        assert_eq!(foreign.index(), 0);

        let mut model = Model::new("single");
        let x = model.add_variable(Variable::continuous("x")).unwrap();
        assert_eq!(x.index(), 0);
        assert_ne!(x, foreign);

        let err = model
            .add_constraint(Constraint::less_equal("c", LinearExpression::sum([foreign]), 1.0))
            .unwrap_err();
        assert!(matches!(err, OptimizationError::ModelConstruction(_)));
        assert!(model
            .set_objective(Objective::minimize(LinearExpression::sum([foreign])))
            .is_err());
        assert!(model.variable(foreign).is_none());
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_cloned_model_keeps_its_ids() {
        let (model, x, _) = two_var_model();
        let mut copy = model.clone();
        copy.add_constraint(Constraint::less_equal("c", LinearExpression::sum([x]), 1.0))
            .unwrap();
        assert_eq!(copy.variable(x).unwrap().name, "x");
    }

    #[test]
    fn test_constraint_names_are_unique() {
        let (mut model, x, y) = two_var_model();
        model
            .add_constraint(Constraint::greater_equal("cover", LinearExpression::sum([x]), 1.0))
            .unwrap();
        assert!(model
            .add_constraint(Constraint::greater_equal("cover", LinearExpression::sum([y]), 1.0))
            .is_err());
        assert!(model
            .add_constraint(Constraint::greater_equal("", LinearExpression::sum([y]), 1.0))
            .is_err());
        assert!(model
            .add_constraint(Constraint::greater_equal("nan", LinearExpression::sum([y]), f64::NAN))
            .is_err());
        assert_eq!(model.constraints().len(), 1);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_max_violation() {
        let (mut model, x, y) = two_var_model();
        model
            .add_constraint(Constraint::equal("total", LinearExpression::sum([x, y]), 10.0))
            .unwrap();
        model
            .add_constraint(Constraint::less_equal("cap", LinearExpression::sum([x]), 4.0))
            .unwrap();
        assert_eq!(model.max_violation(&[4.0, 6.0]), 0.0);
        assert_eq!(model.max_violation(&[7.0, 1.0]), 3.0);
    }

    #[test]
    fn test_solve_result_values_present_iff_optimal() {
        let optimal = SolveResult::optimal(1.0, BTreeMap::from([("x".to_string(), 1.0)]));
        assert!(optimal.is_optimal());
        assert_eq!(optimal.value("x"), Some(1.0));

        let infeasible = SolveResult::infeasible("no solution");
        assert_eq!(infeasible.status(), SolutionStatus::Infeasible);
        assert!(infeasible.objective_value().is_none());
        assert!(infeasible.values().is_none());
    }

    #[test]
    fn test_solver_config_from_lookup() {
        let config = SolverConfig::from_lookup(|key| match key {
            SolverConfig::BACKEND_VAR => Some("highs".to_string()),
            SolverConfig::TIME_LIMIT_VAR => Some("2.5".to_string()),
            SolverConfig::VERBOSE_VAR => Some("true".to_string()),
            _ => None,
        });
        assert_eq!(config.backend, SolverBackend::Highs);
        assert_eq!(config.time_limit, Some(2.5));
        assert!(config.verbose);

        let fallback = SolverConfig::from_lookup(|key| match key {
            SolverConfig::BACKEND_VAR => Some("simplex9000".to_string()),
            SolverConfig::TIME_LIMIT_VAR => Some("-3".to_string()),
            _ => None,
        });
        assert_eq!(fallback.backend, SolverBackend::Auto);
        assert_eq!(fallback.time_limit, None);
        assert!(!fallback.verbose);
    }
}
