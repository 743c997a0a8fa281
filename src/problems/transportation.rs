//! Transportation problem: ship from origins to destinations at minimum cost
//! without exceeding any supply and while meeting every demand.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use super::{invalid, require_name, require_non_negative, ProblemDescriptor};
use crate::domain::{Constraint, LinearExpression, Model, Objective, Result, Variable, VariableId};

#[derive(Debug, Clone, PartialEq)]
pub struct TransportationInput {
    pub origins: Vec<String>,
    pub destinations: Vec<String>,
    /// Unit cost, one row per origin and one column per destination
    pub costs: Vec<Vec<f64>>,
    pub supply: Vec<f64>,
    pub demand: Vec<f64>,
}

impl TransportationInput {
    /// Input with origins and destinations named "Origin 1..", "Destination 1.."
    pub fn numbered(costs: Vec<Vec<f64>>, supply: Vec<f64>, demand: Vec<f64>) -> Self {
        Self {
            origins: (1..=supply.len()).map(|i| format!("Origin {}", i)).collect(),
            destinations: (1..=demand.len()).map(|j| format!("Destination {}", j)).collect(),
            costs,
            supply,
            demand,
        }
    }
}

/// Label of a flow variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub origin: String,
    pub destination: String,
    pub origin_index: usize,
    pub destination_index: usize,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.origin, self.destination)
    }
}

fn check_names(kind: &str, names: &[String]) -> Result<()> {
    if names.is_empty() {
        return Err(invalid(format!("at least one {} is required", kind)));
    }
    let mut seen = HashSet::new();
    for name in names {
        let name = require_name(kind, name)?;
        if !seen.insert(name) {
            return Err(invalid(format!("{} '{}' is listed twice", kind, name)));
        }
    }
    Ok(())
}

fn validate(input: &TransportationInput) -> Result<()> {
    check_names("origin", &input.origins)?;
    check_names("destination", &input.destinations)?;

    let rows = input.origins.len();
    let cols = input.destinations.len();

    if input.supply.len() != rows {
        return Err(invalid(format!(
            "supply has {} entries but there are {} origins",
            input.supply.len(),
            rows
        )));
    }
    if input.demand.len() != cols {
        return Err(invalid(format!(
            "demand has {} entries but there are {} destinations",
            input.demand.len(),
            cols
        )));
    }
    if input.costs.len() != rows {
        return Err(invalid(format!(
            "cost matrix has {} rows but there are {} origins",
            input.costs.len(),
            rows
        )));
    }
    for (i, row) in input.costs.iter().enumerate() {
        if row.len() != cols {
            return Err(invalid(format!(
                "cost matrix row {} has {} columns but there are {} destinations",
                i + 1,
                row.len(),
                cols
            )));
        }
        for (j, &cost) in row.iter().enumerate() {
            require_non_negative(&format!("cost from origin {} to destination {}", i + 1, j + 1), cost)?;
        }
    }
    for (i, &s) in input.supply.iter().enumerate() {
        require_non_negative(&format!("supply of origin {}", i + 1), s)?;
    }
    for (j, &d) in input.demand.iter().enumerate() {
        require_non_negative(&format!("demand of destination {}", j + 1), d)?;
    }
    Ok(())
}

/// Build the transportation model; variables are labelled with their route
pub fn build(input: &TransportationInput) -> Result<ProblemDescriptor<Route>> {
    validate(input)?;

    let rows = input.origins.len();
    let cols = input.destinations.len();

    let mut model = Model::new("Transportation_Problem");
    let mut flows: Vec<Vec<VariableId>> = Vec::with_capacity(rows);
    let mut labels = Vec::with_capacity(rows * cols);

    for (i, origin) in input.origins.iter().enumerate() {
        let mut row = Vec::with_capacity(cols);
        for (j, destination) in input.destinations.iter().enumerate() {
            let id = model.add_variable(Variable::continuous(format!("x_{}_{}", i, j)))?;
            row.push(id);
            labels.push((
                id,
                Route {
                    origin: origin.trim().to_string(),
                    destination: destination.trim().to_string(),
                    origin_index: i,
                    destination_index: j,
                },
            ));
        }
        flows.push(row);
    }

    model.set_objective(Objective::minimize(
        flows
            .iter()
            .zip(&input.costs)
            .flat_map(|(vars, costs)| vars.iter().copied().zip(costs.iter().copied()))
            .collect(),
    ))?;

    for (i, row) in flows.iter().enumerate() {
        model.add_constraint(Constraint::less_equal(
            format!("supply_{}", i),
            LinearExpression::sum(row.iter().copied()),
            input.supply[i],
        ))?;
    }

    for j in 0..cols {
        model.add_constraint(Constraint::greater_equal(
            format!("demand_{}", j),
            LinearExpression::sum(flows.iter().map(|row| row[j])),
            input.demand[j],
        ))?;
    }

    debug!(origins = rows, destinations = cols, "transportation model built");

    Ok(ProblemDescriptor::new(model, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConstraintType, OptimizationError};

    fn two_by_three() -> TransportationInput {
        TransportationInput::numbered(
            vec![vec![4.0, 6.0, 9.0], vec![5.0, 3.0, 7.0]],
            vec![50.0, 60.0],
            vec![30.0, 40.0, 20.0],
        )
    }

    #[test]
    fn test_numbered_names() {
        let input = two_by_three();
        assert_eq!(input.origins, vec!["Origin 1", "Origin 2"]);
        assert_eq!(input.destinations[2], "Destination 3");
    }

    #[test]
    fn test_build_transportation_model() {
        let descriptor = build(&two_by_three()).unwrap();
        let model = descriptor.model();

        assert_eq!(model.num_variables(), 6);
        assert_eq!(model.constraints().len(), 5);

        let x_1_2 = model.variable_id("x_1_2").unwrap();
        assert_eq!(model.objective().expression.coefficient(x_1_2), 7.0);

        let supply_1 = &model.constraints()[1];
        assert_eq!(supply_1.name, "supply_1");
        assert_eq!(supply_1.constraint_type, ConstraintType::LessThanOrEqual);
        assert_eq!(supply_1.expression.len(), 3);
        assert_eq!(supply_1.bound, 60.0);

        let demand_2 = &model.constraints()[4];
        assert_eq!(demand_2.name, "demand_2");
        assert_eq!(demand_2.constraint_type, ConstraintType::GreaterThanOrEqual);
        assert_eq!(demand_2.expression.coefficient(x_1_2), 1.0);
        assert_eq!(demand_2.bound, 20.0);

        let route = descriptor.label(x_1_2).unwrap();
        assert_eq!(route.to_string(), "Origin 2 -> Destination 3");
    }

    #[test]
    fn test_dimension_mismatches_are_rejected() {
        let mut short_supply = two_by_three();
        short_supply.supply.pop();

        let mut short_row = two_by_three();
        short_row.costs[1].pop();

        let mut extra_demand = two_by_three();
        extra_demand.demand.push(5.0);

        let mut negative_cost = two_by_three();
        negative_cost.costs[0][0] = -1.0;

        let mut blank_origin = two_by_three();
        blank_origin.origins[0] = "   ".to_string();

        let empty = TransportationInput::numbered(vec![], vec![], vec![]);

        for input in [short_supply, short_row, extra_demand, negative_cost, blank_origin, empty] {
            assert!(matches!(build(&input), Err(OptimizationError::InvalidInput(_))));
        }
    }
}
