// Application layer: labels solver output for callers and exposes the gRPC service
pub mod result_mapper;

#[cfg(feature = "server")]
pub mod grpc_service;
#[cfg(feature = "server")]
pub mod mappers;

pub use result_mapper::{map_result, solve_and_map, MappedResult, ResultLabel, ResultRecord};

#[cfg(feature = "server")]
pub use grpc_service::GrpcPlannerService;
