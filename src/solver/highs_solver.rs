// HiGHS backend
// Buffers columns and rows, then builds a HiGHS RowProblem on optimize
// (RowProblem needs objective coefficients when a column is added)

use highs::{HighsModelStatus, RowProblem, Sense};

use super::adapter::{Backend, BackendError, BackendStatus, SessionFactory, SolverAdapter};
use crate::domain::{
    models::{SolverConfig, Variable},
    value_objects::{ConstraintType, OptimizationType},
};

struct Column {
    integer: bool,
    lower: f64,
    upper: f64,
}

struct Row {
    terms: Vec<(usize, f64)>,
    constraint_type: ConstraintType,
    bound: f64,
}

pub struct HighsBackend {
    config: SolverConfig,
    columns: Vec<Column>,
    objective: Vec<f64>,
    sense: OptimizationType,
    rows: Vec<Row>,
    solution: Option<Vec<f64>>,
}

impl HighsBackend {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            columns: Vec::new(),
            objective: Vec::new(),
            sense: OptimizationType::Minimize,
            rows: Vec::new(),
            solution: None,
        }
    }

    fn check_columns(&self, terms: &[(usize, f64)]) -> Result<(), BackendError> {
        match terms.iter().find(|(col, _)| *col >= self.columns.len()) {
            Some((col, _)) => Err(BackendError(format!("unknown column {}", col))),
            None => Ok(()),
        }
    }
}

impl Backend for HighsBackend {
    type Column = usize;

    fn declare_variable(&mut self, var_def: &Variable) -> Result<usize, BackendError> {
        self.columns.push(Column {
            integer: var_def.is_integer(),
            lower: var_def.lower_bound,
            upper: var_def.upper_bound.unwrap_or(f64::INFINITY),
        });
        self.objective.push(0.0);
        Ok(self.columns.len() - 1)
    }

    fn set_objective(&mut self, sense: OptimizationType, terms: &[(usize, f64)]) -> Result<(), BackendError> {
        self.check_columns(terms)?;
        self.objective.iter_mut().for_each(|c| *c = 0.0);
        for &(col, coeff) in terms {
            self.objective[col] += coeff;
        }
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
        self.check_columns(terms)?;
        self.rows.push(Row {
            terms: terms.to_vec(),
            constraint_type,
            bound,
        });
        Ok(())
    }

    fn optimize(&mut self) -> Result<BackendStatus, BackendError> {
        // Use HiGHS RowProblem (add variables first, then constraints)
        let mut pb = RowProblem::default();
        let mut cols = Vec::with_capacity(self.columns.len());

        for (column, &obj_coeff) in self.columns.iter().zip(&self.objective) {
            let col = if column.integer {
                pb.add_integer_column(obj_coeff, column.lower..=column.upper)
            } else {
                pb.add_column(obj_coeff, column.lower..=column.upper)
            };
            cols.push(col);
        }

        for row in &self.rows {
            let factors: Vec<_> = row.terms.iter().map(|&(c, coeff)| (cols[c], coeff)).collect();
            match row.constraint_type {
                ConstraintType::LessThanOrEqual => {
                    pb.add_row(..=row.bound, &factors);
                }
                ConstraintType::Equal => {
                    pb.add_row(row.bound..=row.bound, &factors);
                }
                ConstraintType::GreaterThanOrEqual => {
                    pb.add_row(row.bound.., &factors);
                }
            }
        }

        let sense = match self.sense {
            OptimizationType::Minimize => Sense::Minimise,
            OptimizationType::Maximize => Sense::Maximise,
        };

        let mut model = pb.optimise(sense);
        model.set_option("output_flag", self.config.verbose);
        if let Some(limit) = self.config.time_limit {
            model.set_option("time_limit", limit);
        }

        let solved = model
            .try_solve()
            .map_err(|status| BackendError(format!("HiGHS run failed: {:?}", status)))?;

        let status = match solved.status() {
            HighsModelStatus::Optimal => {
                self.solution = Some(solved.get_solution().columns().to_vec());
                BackendStatus::Optimal
            }
            HighsModelStatus::Infeasible => BackendStatus::Infeasible,
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                BackendStatus::Unbounded
            }
            other => BackendStatus::Stopped(format!("{:?}", other)),
        };
        Ok(status)
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

/// Session factory for HiGHS
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsSessions;

impl SessionFactory for HighsSessions {
    type Backend = HighsBackend;

    fn open(&self, config: &SolverConfig) -> Result<HighsBackend, BackendError> {
        Ok(HighsBackend::new(config.clone()))
    }

    fn name(&self) -> &str {
        "HiGHS"
    }

    fn supports_mip(&self) -> bool {
        true
    }
}

pub type HighsSolver = SolverAdapter<HighsSessions>;

impl HighsSolver {
    pub fn highs(config: SolverConfig) -> Self {
        SolverAdapter::with_config(HighsSessions, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Constraint, LinearExpression, Model, Objective, SolutionStatus, SolverService};

    #[test]
    fn test_highs_solves_equality_constrained_blend() {
        let mut model = Model::new("blend");
        let a = model.add_variable(Variable::continuous("a")).unwrap();
        let b = model
            .add_variable(Variable::continuous("b").with_bounds(0.0, Some(40.0)))
            .unwrap();
        model
            .set_objective(Objective::minimize(LinearExpression::new().term(a, 10.0).term(b, 5.0)))
            .unwrap();
        model
            .add_constraint(Constraint::equal("total", LinearExpression::sum([a, b]), 100.0))
            .unwrap();

        let result = HighsSolver::highs(SolverConfig::default()).solve(&model).unwrap();
        assert_eq!(result.status(), SolutionStatus::Optimal);
        assert!((result.value("b").unwrap() - 40.0).abs() < 1e-6);
        assert!((result.objective_value().unwrap() - 800.0).abs() < 1e-6);
    }

    #[test]
    fn test_highs_reports_infeasible_mip() {
        let mut model = Model::new("too_many");
        let a = model.add_variable(Variable::binary("a")).unwrap();
        model
            .set_objective(Objective::minimize(LinearExpression::sum([a])))
            .unwrap();
        model
            .add_constraint(Constraint::greater_equal("need_two", LinearExpression::sum([a]), 2.0))
            .unwrap();

        let result = HighsSolver::highs(SolverConfig::default()).solve(&model).unwrap();
        assert_ne!(result.status(), SolutionStatus::Optimal);
        assert!(result.values().is_none());
    }
}
