//! Problem descriptor builders.
//!
//! Each builder turns an immutable, domain-specific input record into a
//! [`ProblemDescriptor`]: a solver-agnostic [`Model`] plus the labels that tie
//! each decision variable back to the entity it stands for.

pub mod blending;
pub mod coverage;
pub mod transportation;

pub use blending::{BlendingInput, Resource, ResourceLabel, Unit};
pub use coverage::{CoverageInput, Zone};
pub use transportation::{Route, TransportationInput};

use crate::domain::{Model, OptimizationError, Result, VariableId};

/// A built model together with the label of every decision variable
#[derive(Debug, Clone)]
pub struct ProblemDescriptor<L> {
    model: Model,
    labels: Vec<(VariableId, L)>,
}

impl<L> ProblemDescriptor<L> {
    pub fn new(model: Model, labels: Vec<(VariableId, L)>) -> Self {
        Self { model, labels }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Variable/label bindings in build order
    pub fn labels(&self) -> &[(VariableId, L)] {
        &self.labels
    }

    pub fn label(&self, id: VariableId) -> Option<&L> {
        self.labels.iter().find(|(v, _)| *v == id).map(|(_, l)| l)
    }
}

fn invalid(message: impl Into<String>) -> OptimizationError {
    OptimizationError::InvalidInput(message.into())
}

fn require_name<'a>(kind: &str, name: &'a str) -> Result<&'a str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(invalid(format!("{} name must not be blank", kind)));
    }
    Ok(trimmed)
}

fn require_non_negative(what: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(format!("{} must be a finite number >= 0 (got {})", what, value)));
    }
    Ok(value)
}

fn require_percentage(what: &str, value: f64) -> Result<f64> {
    require_non_negative(what, value)?;
    if value > 100.0 {
        return Err(invalid(format!("{} must be between 0 and 100 (got {})", what, value)));
    }
    Ok(value)
}
