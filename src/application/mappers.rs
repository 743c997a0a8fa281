// Mappers: Convert between gRPC protobuf types and domain types
// This keeps protobuf dependencies isolated from the modelling core

use tonic::Status;

use super::result_mapper::{MappedResult, ResultLabel, ResultRecord};
use crate::domain::{OptimizationError, SolutionStatus, SolveResult};
use crate::problems::{
    BlendingInput, CoverageInput, Resource, ResourceLabel, Route, TransportationInput, Unit, Zone,
};

pub mod letsplan {
    tonic::include_proto!("letsplan");
}

use letsplan as proto;

/// Plain-text label carried in a proto record
pub trait ProtoLabel: ResultLabel {
    fn label_text(&self) -> String;
}

impl ProtoLabel for String {
    fn label_text(&self) -> String {
        self.clone()
    }
}

impl ProtoLabel for ResourceLabel {
    fn label_text(&self) -> String {
        self.name.clone()
    }
}

impl ProtoLabel for Route {
    fn label_text(&self) -> String {
        self.to_string()
    }
}

pub fn error_to_status(error: OptimizationError) -> Status {
    match error {
        OptimizationError::InvalidInput(_) => Status::invalid_argument(error.to_string()),
        OptimizationError::ModelConstruction(_) => Status::internal(error.to_string()),
        OptimizationError::SolverUnavailable(_) => Status::unavailable(error.to_string()),
    }
}

pub fn proto_to_coverage(request: proto::CoverageRequest) -> CoverageInput {
    CoverageInput::new(
        request
            .zones
            .into_iter()
            .map(|z| Zone::new(z.sites, z.zone_id, z.min_antennas))
            .collect(),
    )
}

fn proto_to_unit(raw: i32) -> std::result::Result<Unit, Box<Status>> {
    match proto::resource::Unit::try_from(raw) {
        Ok(proto::resource::Unit::Kg) => Ok(Unit::Kg),
        Ok(proto::resource::Unit::Litre) => Ok(Unit::Litre),
        Ok(proto::resource::Unit::Tonne) => Ok(Unit::Tonne),
        Ok(proto::resource::Unit::Unit) => Ok(Unit::Unit),
        Err(_) => Err(Box::new(Status::invalid_argument("Invalid resource unit"))),
    }
}

pub fn proto_to_blending(
    request: proto::BlendingRequest,
) -> std::result::Result<BlendingInput, Box<Status>> {
    let resources = request
        .resources
        .into_iter()
        .map(|r| -> std::result::Result<Resource, Box<Status>> {
            let unit = proto_to_unit(r.unit)?;
            Ok(Resource::new(r.name, r.cost, r.stock, r.contribution_pct).with_unit(unit))
        })
        .collect::<std::result::Result<Vec<_>, Box<Status>>>()?;

    Ok(BlendingInput::new(
        request.total_quantity,
        request.min_contribution_pct,
        resources,
    ))
}

pub fn proto_to_transportation(request: proto::TransportationRequest) -> TransportationInput {
    let costs = request.costs.into_iter().map(|row| row.costs).collect();
    let mut input = TransportationInput::numbered(costs, request.supply, request.demand);
    if !request.origins.is_empty() {
        input.origins = request.origins;
    }
    if !request.destinations.is_empty() {
        input.destinations = request.destinations;
    }
    input
}

fn status_to_proto(status: SolutionStatus) -> i32 {
    match status {
        SolutionStatus::Optimal => proto::SolutionStatus::Optimal as i32,
        SolutionStatus::Infeasible => proto::SolutionStatus::Infeasible as i32,
        SolutionStatus::Unbounded => proto::SolutionStatus::Unbounded as i32,
        SolutionStatus::Error => proto::SolutionStatus::Error as i32,
    }
}

/// Convert a mapped result to the protobuf report; `result` is the solve it was mapped from
pub fn mapped_to_proto<L: ProtoLabel>(
    mapped: &MappedResult<L>,
    result: &SolveResult,
) -> proto::SolveReport {
    let statistics = result.statistics();
    let records = mapped
        .records
        .iter()
        .filter_map(|record| match record {
            ResultRecord::Assignment { label, value } => Some(proto::Record {
                label: label.label_text(),
                value: *value,
                display: record.to_string(),
            }),
            ResultRecord::Diagnostic { .. } => None,
        })
        .collect();

    proto::SolveReport {
        status: status_to_proto(mapped.status),
        objective_value: mapped.objective_value,
        records,
        message: mapped.message().unwrap_or(result.message()).to_string(),
        statistics: Some(proto::SolverStatistics {
            solver_backend: statistics.backend.clone(),
            solve_time_ms: statistics.solve_time_ms,
            num_variables: statistics.num_variables,
            num_constraints: statistics.num_constraints,
            num_integer_vars: statistics.num_integer_vars,
            num_binary_vars: statistics.num_binary_vars,
            max_constraint_violation: statistics.max_constraint_violation,
        }),
    }
}
