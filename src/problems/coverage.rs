//! Antenna placement as a set-cover model.
//!
//! One binary variable per candidate site; minimise the number of antennas
//! while every zone gets at least its required number of antennas among its
//! neighbouring sites.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::{invalid, require_name, ProblemDescriptor};
use crate::domain::{Constraint, LinearExpression, Model, Objective, Result, Variable, VariableId};

/// A zone, the sites able to serve it and how many antennas it needs
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub sites: Vec<String>,
    pub zone_id: u32,
    pub min_antennas: u32,
}

impl Zone {
    pub fn new<S: Into<String>>(sites: impl IntoIterator<Item = S>, zone_id: u32, min_antennas: u32) -> Self {
        Self {
            sites: sites.into_iter().map(Into::into).collect(),
            zone_id,
            min_antennas,
        }
    }

    /// Parse a comma-separated site list such as `"A, B,,C"`; empty entries are dropped
    pub fn from_site_list(list: &str, zone_id: u32, min_antennas: u32) -> Self {
        Self::new(
            list.split(',').map(str::trim).filter(|s| !s.is_empty()),
            zone_id,
            min_antennas,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageInput {
    pub zones: Vec<Zone>,
}

impl CoverageInput {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self { zones }
    }
}

/// Build the coverage model; variables are labelled with their site name
pub fn build(input: &CoverageInput) -> Result<ProblemDescriptor<String>> {
    if input.zones.is_empty() {
        return Err(invalid("at least one zone is required"));
    }

    let mut zone_ids = HashSet::new();
    for zone in &input.zones {
        if !zone_ids.insert(zone.zone_id) {
            return Err(invalid(format!("zone {} is defined twice", zone.zone_id)));
        }
        if zone.sites.is_empty() {
            return Err(invalid(format!("zone {} has no neighbouring sites", zone.zone_id)));
        }
    }

    let mut model = Model::new("CoverageProblem");
    let mut site_vars: HashMap<&str, VariableId> = HashMap::new();
    let mut labels = Vec::new();

    // One binary variable per unique site, in order of first appearance
    for zone in &input.zones {
        for site in &zone.sites {
            let site = require_name("site", site)?;
            if !site_vars.contains_key(site) {
                let id = model.add_variable(Variable::binary(format!("x_{}", site)))?;
                site_vars.insert(site, id);
                labels.push((id, site.to_string()));
            }
        }
    }

    model.set_objective(Objective::minimize(LinearExpression::sum(
        labels.iter().map(|(id, _)| *id),
    )))?;

    for zone in &input.zones {
        let mut seen = HashSet::new();
        let covering = zone
            .sites
            .iter()
            .map(|s| s.trim())
            .filter(|s| seen.insert(*s))
            .map(|s| site_vars[s]);

        model.add_constraint(Constraint::greater_equal(
            format!("antenna_constraint_{}", zone.zone_id),
            LinearExpression::sum(covering),
            f64::from(zone.min_antennas),
        ))?;
    }

    debug!(
        zones = input.zones.len(),
        sites = labels.len(),
        "coverage model built"
    );

    Ok(ProblemDescriptor::new(model, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConstraintType, OptimizationError, OptimizationType};

    #[test]
    fn test_from_site_list_trims_and_drops_empty_entries() {
        let zone = Zone::from_site_list(" A, B,,C ,", 3, 2);
        assert_eq!(zone.sites, vec!["A", "B", "C"]);
        assert_eq!(zone.zone_id, 3);
        assert_eq!(zone.min_antennas, 2);
    }

    #[test]
    fn test_build_one_variable_per_unique_site() {
        let input = CoverageInput::new(vec![
            Zone::new(["A", "B"], 1, 1),
            Zone::new(["B", "C"], 2, 1),
        ]);
        let descriptor = build(&input).unwrap();
        let model = descriptor.model();

        let sites: Vec<&str> = descriptor.labels().iter().map(|(_, s)| s.as_str()).collect();
        assert_eq!(sites, vec!["A", "B", "C"]);
        assert_eq!(model.num_binary_variables(), 3);
        assert_eq!(model.objective().optimization_type, OptimizationType::Minimize);
        assert_eq!(model.objective().expression.len(), 3);

        assert_eq!(model.constraints().len(), 2);
        let zone_2 = &model.constraints()[1];
        assert_eq!(zone_2.name, "antenna_constraint_2");
        assert_eq!(zone_2.constraint_type, ConstraintType::GreaterThanOrEqual);
        assert_eq!(zone_2.bound, 1.0);
        let b = model.variable_id("x_B").unwrap();
        let a = model.variable_id("x_A").unwrap();
        assert_eq!(zone_2.expression.coefficient(b), 1.0);
        assert_eq!(zone_2.expression.coefficient(a), 0.0);
    }

    #[test]
    fn test_repeated_site_in_zone_counts_once() {
        let input = CoverageInput::new(vec![Zone::new(["A", "A ", "B"], 1, 2)]);
        let descriptor = build(&input).unwrap();
        let constraint = &descriptor.model().constraints()[0];
        let a = descriptor.model().variable_id("x_A").unwrap();
        assert_eq!(constraint.expression.coefficient(a), 1.0);
        assert_eq!(constraint.expression.len(), 2);
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        let cases = vec![
            CoverageInput::new(vec![]),
            CoverageInput::new(vec![Zone::new(Vec::<String>::new(), 1, 1)]),
            CoverageInput::new(vec![Zone::new(["A", " "], 1, 1)]),
            CoverageInput::new(vec![Zone::new(["A"], 1, 1), Zone::new(["B"], 1, 1)]),
        ];
        for input in cases {
            assert!(
                matches!(build(&input), Err(OptimizationError::InvalidInput(_))),
                "expected rejection of {:?}",
                input
            );
        }
    }
}
