//! Blending: choose how much of each resource goes into a fixed total
//! quantity at minimum cost, while the main characteristic reaches a minimum
//! share of the blend.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use super::{invalid, require_name, require_non_negative, require_percentage, ProblemDescriptor};
use crate::domain::{Constraint, LinearExpression, Model, Objective, Result, Variable};

/// Unit a resource is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    #[default]
    Kg,
    Litre,
    Tonne,
    Unit,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Kg => write!(f, "kg"),
            Unit::Litre => write!(f, "litre"),
            Unit::Tonne => write!(f, "tonne"),
            Unit::Unit => write!(f, "unit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    /// Cost per unit of quantity
    pub cost: f64,
    /// Available stock
    pub stock: f64,
    /// Share of the main characteristic carried by one unit, in percent
    pub contribution_pct: f64,
    pub unit: Unit,
}

impl Resource {
    pub fn new(name: impl Into<String>, cost: f64, stock: f64, contribution_pct: f64) -> Self {
        Self {
            name: name.into(),
            cost,
            stock,
            contribution_pct,
            unit: Unit::default(),
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlendingInput {
    pub total_quantity: f64,
    /// Minimum share of the main characteristic in the blend, in percent
    pub min_contribution_pct: f64,
    pub resources: Vec<Resource>,
}

impl BlendingInput {
    pub fn new(total_quantity: f64, min_contribution_pct: f64, resources: Vec<Resource>) -> Self {
        Self {
            total_quantity,
            min_contribution_pct,
            resources,
        }
    }

    /// Characteristic amount the blend must reach
    pub fn min_contribution(&self) -> f64 {
        self.min_contribution_pct / 100.0 * self.total_quantity
    }
}

/// Label of a blending variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLabel {
    pub name: String,
    pub unit: Unit,
}

/// Build the blending model; variables are labelled with resource name and unit
pub fn build(input: &BlendingInput) -> Result<ProblemDescriptor<ResourceLabel>> {
    if input.resources.is_empty() {
        return Err(invalid("at least one resource is required"));
    }
    require_non_negative("total quantity", input.total_quantity)?;
    require_percentage("minimum contribution", input.min_contribution_pct)?;

    let mut names = HashSet::new();
    for resource in &input.resources {
        let name = require_name("resource", &resource.name)?;
        if !names.insert(name) {
            return Err(invalid(format!("resource '{}' is listed twice", name)));
        }
        require_non_negative(&format!("cost of '{}'", name), resource.cost)?;
        require_non_negative(&format!("stock of '{}'", name), resource.stock)?;
        require_percentage(&format!("contribution of '{}'", name), resource.contribution_pct)?;
    }

    let mut model = Model::new("BlendingProblem");
    let mut labels = Vec::with_capacity(input.resources.len());
    for resource in &input.resources {
        let name = resource.name.trim();
        let id = model.add_variable(Variable::continuous(format!("x_{}", name)))?;
        labels.push((
            id,
            ResourceLabel {
                name: name.to_string(),
                unit: resource.unit,
            },
        ));
    }

    let vars = || labels.iter().map(|(id, _)| *id).zip(&input.resources);

    model.set_objective(Objective::minimize(
        vars().map(|(id, r)| (id, r.cost)).collect(),
    ))?;

    model.add_constraint(Constraint::equal(
        "total_quantity",
        LinearExpression::sum(vars().map(|(id, _)| id)),
        input.total_quantity,
    ))?;

    model.add_constraint(Constraint::greater_equal(
        "min_contribution",
        vars().map(|(id, r)| (id, r.contribution_pct / 100.0)).collect(),
        input.min_contribution(),
    ))?;

    for (id, resource) in vars() {
        model.add_constraint(Constraint::less_equal(
            format!("stock_max_{}", resource.name.trim()),
            LinearExpression::sum([id]),
            resource.stock,
        ))?;
    }

    debug!(
        resources = input.resources.len(),
        total = input.total_quantity,
        min_contribution = input.min_contribution(),
        "blending model built"
    );

    Ok(ProblemDescriptor::new(model, labels))
}
