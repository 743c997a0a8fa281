// Domain layer: modelling vocabulary, solve outcomes and the solver port
pub mod domain;

// Problem builders: turn domain input into a model plus variable labels
pub mod problems;

// Solver adapters: concrete implementations of SolverService
pub mod solver;

// Application layer: result mapping and the gRPC service
pub mod application;

// Infrastructure layer: External concerns (gRPC, server)
#[cfg(feature = "server")]
pub mod infrastructure;

// Re-export commonly used types
pub use domain::{
    Constraint, ConstraintType, LinearExpression, Model, Objective, OptimizationError,
    OptimizationType, SolutionStatus, SolveResult, SolverBackend, SolverConfig, SolverService,
    SolverStatistics, Variable, VariableId, VariableType,
};

pub use application::{map_result, solve_and_map, MappedResult, ResultRecord};
pub use problems::ProblemDescriptor;
pub use solver::SolverFactory;

#[cfg(feature = "server")]
pub use application::GrpcPlannerService;

#[cfg(feature = "server")]
pub use infrastructure::{start_server, ServerConfig};
