// Result Mapper: re-joins solved variable values with the domain labels
// recorded by the problem builders

use std::fmt;

use crate::domain::{Result, SolutionStatus, SolveResult, SolverService};
use crate::problems::{ProblemDescriptor, ResourceLabel, Route};

/// How a label presents its solved value
pub trait ResultLabel {
    fn describe(&self, value: f64) -> String;
}

impl ResultLabel for String {
    fn describe(&self, value: f64) -> String {
        format!("{}: {}", self, value)
    }
}

impl ResultLabel for ResourceLabel {
    fn describe(&self, value: f64) -> String {
        format!("{}: {:.2} {}", self.name, value, self.unit)
    }
}

impl ResultLabel for Route {
    fn describe(&self, value: f64) -> String {
        format!("{}: {}", self, value)
    }
}

/// One row handed to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum ResultRecord<L> {
    Assignment { label: L, value: f64 },
    Diagnostic { status: SolutionStatus, message: String },
}

impl<L: ResultLabel> fmt::Display for ResultRecord<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultRecord::Assignment { label, value } => write!(f, "{}", label.describe(*value)),
            ResultRecord::Diagnostic { status, message } => write!(f, "{}: {}", status, message),
        }
    }
}

/// Labelled outcome of a solve.
///
/// Optimal outcomes carry one assignment per variable in build order; any
/// other outcome carries exactly one diagnostic record.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedResult<L> {
    pub status: SolutionStatus,
    pub objective_value: Option<f64>,
    pub records: Vec<ResultRecord<L>>,
}

impl<L> MappedResult<L> {
    fn diagnostic(status: SolutionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            objective_value: None,
            records: vec![ResultRecord::Diagnostic {
                status,
                message: message.into(),
            }],
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    pub fn assignments(&self) -> impl Iterator<Item = (&L, f64)> + '_ {
        self.records.iter().filter_map(|r| match r {
            ResultRecord::Assignment { label, value } => Some((label, *value)),
            ResultRecord::Diagnostic { .. } => None,
        })
    }

    /// Labels whose value rounds to a positive amount (chosen sites, used routes)
    pub fn selected(&self) -> impl Iterator<Item = &L> + '_ {
        self.assignments()
            .filter(|&(_, value)| value > 0.5)
            .map(|(label, _)| label)
    }

    pub fn message(&self) -> Option<&str> {
        self.records.iter().find_map(|r| match r {
            ResultRecord::Diagnostic { message, .. } => Some(message.as_str()),
            ResultRecord::Assignment { .. } => None,
        })
    }
}

impl MappedResult<Route> {
    /// Optimal flows as an origins × destinations table, `None` unless optimal
    pub fn flow_matrix(&self) -> Option<Vec<Vec<f64>>> {
        if !self.is_optimal() {
            return None;
        }
        let (rows, cols) = self.assignments().fold((0, 0), |(r, c), (route, _)| {
            (r.max(route.origin_index + 1), c.max(route.destination_index + 1))
        });
        let mut matrix = vec![vec![0.0; cols]; rows];
        for (route, value) in self.assignments() {
            matrix[route.origin_index][route.destination_index] = value;
        }
        Some(matrix)
    }
}

/// Map a solve result onto the labels of `descriptor`
pub fn map_result<L: Clone>(descriptor: &ProblemDescriptor<L>, result: &SolveResult) -> MappedResult<L> {
    let (Some(values), Some(objective_value)) = (result.values(), result.objective_value()) else {
        return MappedResult::diagnostic(result.status(), result.message());
    };

    let mut records = Vec::with_capacity(descriptor.labels().len());
    for (id, label) in descriptor.labels() {
        let value = descriptor
            .model()
            .variable(*id)
            .and_then(|v| values.get(&v.name).copied());
        match value {
            Some(value) => records.push(ResultRecord::Assignment {
                label: label.clone(),
                value,
            }),
            None => {
                return MappedResult::diagnostic(
                    SolutionStatus::Error,
                    format!("solver returned no value for variable #{}", id.index()),
                )
            }
        }
    }

    MappedResult {
        status: result.status(),
        objective_value: Some(objective_value),
        records,
    }
}

/// Solve the descriptor's model with `solver` and map the outcome
pub fn solve_and_map<L: Clone>(
    descriptor: &ProblemDescriptor<L>,
    solver: &dyn SolverService,
) -> Result<MappedResult<L>> {
    let result = solver.solve(descriptor.model())?;
    Ok(map_result(descriptor, &result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Model, Variable};
    use crate::problems::Unit;
    use std::collections::BTreeMap;

    fn sites_descriptor() -> ProblemDescriptor<String> {
        let mut model = Model::new("sites");
        let a = model.add_variable(Variable::binary("x_A")).unwrap();
        let b = model.add_variable(Variable::binary("x_B")).unwrap();
        ProblemDescriptor::new(model, vec![(a, "A".to_string()), (b, "B".to_string())])
    }

    #[test]
    fn test_optimal_result_maps_to_labelled_records() {
        let result = SolveResult::optimal(
            1.0,
            BTreeMap::from([("x_A".to_string(), 0.0), ("x_B".to_string(), 1.0)]),
        );
        let mapped = map_result(&sites_descriptor(), &result);

        assert!(mapped.is_optimal());
        assert_eq!(mapped.objective_value, Some(1.0));
        assert_eq!(mapped.records.len(), 2);
        assert_eq!(mapped.records[1].to_string(), "B: 1");
        assert_eq!(mapped.selected().collect::<Vec<_>>(), vec!["B"]);
        assert!(mapped.message().is_none());
    }

    #[test]
    fn test_non_optimal_result_is_a_single_diagnostic() {
        for result in [
            SolveResult::infeasible("no solution satisfies all constraints"),
            SolveResult::unbounded("objective can be improved infinitely"),
            SolveResult::error("license expired"),
        ] {
            let mapped = map_result(&sites_descriptor(), &result);
            assert_eq!(mapped.status, result.status());
            assert_eq!(mapped.records.len(), 1);
            assert_eq!(mapped.assignments().count(), 0);
            assert_eq!(mapped.message(), Some(result.message()));
        }
    }

    #[test]
    fn test_missing_value_never_yields_partial_records() {
        let result = SolveResult::optimal(0.0, BTreeMap::from([("x_A".to_string(), 0.0)]));
        let mapped = map_result(&sites_descriptor(), &result);
        assert_eq!(mapped.status, SolutionStatus::Error);
        assert_eq!(mapped.records.len(), 1);
        assert_eq!(mapped.assignments().count(), 0);
    }

    #[test]
    fn test_flow_matrix_places_routes_by_index() {
        let route = |i: usize, j: usize| Route {
            origin: format!("O{}", i),
            destination: format!("D{}", j),
            origin_index: i,
            destination_index: j,
        };
        let mapped = MappedResult {
            status: SolutionStatus::Optimal,
            objective_value: Some(7.0),
            records: vec![
                ResultRecord::Assignment { label: route(0, 0), value: 0.0 },
                ResultRecord::Assignment { label: route(0, 1), value: 2.0 },
                ResultRecord::Assignment { label: route(1, 0), value: 5.0 },
                ResultRecord::Assignment { label: route(1, 1), value: 0.0 },
            ],
        };
        assert_eq!(mapped.flow_matrix(), Some(vec![vec![0.0, 2.0], vec![5.0, 0.0]]));

        let infeasible: MappedResult<Route> =
            MappedResult::diagnostic(SolutionStatus::Infeasible, "demand exceeds supply");
        assert!(infeasible.flow_matrix().is_none());
    }

    #[test]
    fn test_record_display() {
        let blend = ResultRecord::Assignment {
            label: ResourceLabel {
                name: "Clay".to_string(),
                unit: Unit::Tonne,
            },
            value: 40.0,
        };
        assert_eq!(blend.to_string(), "Clay: 40.00 tonne");

        let diagnostic: ResultRecord<String> = ResultRecord::Diagnostic {
            status: SolutionStatus::Infeasible,
            message: "zone 3 cannot be covered".to_string(),
        };
        assert_eq!(diagnostic.to_string(), "Infeasible: zone 3 cannot be covered");
    }
}
