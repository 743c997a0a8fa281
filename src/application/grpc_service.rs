use tonic::{Request, Response, Status};
use tracing::info;

use super::mappers::{self, letsplan, ProtoLabel};
use super::result_mapper::map_result;
use crate::domain::{Result, SolverConfig};
use crate::problems::{blending, coverage, transportation, ProblemDescriptor};
use crate::solver::SolverFactory;

/// gRPC service implementation
pub struct GrpcPlannerService {
    config: SolverConfig,
}

impl GrpcPlannerService {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Build, solve and map one problem on the blocking pool
    async fn run<L, F>(
        &self,
        problem: &'static str,
        build: F,
    ) -> std::result::Result<Response<letsplan::SolveReport>, Status>
    where
        L: ProtoLabel + Clone + Send + 'static,
        F: FnOnce() -> Result<ProblemDescriptor<L>> + Send + 'static,
    {
        let config = self.config.clone();

        let report = tokio::task::spawn_blocking(move || {
            let descriptor = build().map_err(mappers::error_to_status)?;
            let solver = SolverFactory::create(&config).map_err(mappers::error_to_status)?;
            info!(problem, solver = solver.name(), "solving");

            let result = solver
                .solve(descriptor.model())
                .map_err(mappers::error_to_status)?;
            info!(problem, status = %result.status(), "solved");

            let mapped = map_result(&descriptor, &result);
            Ok::<_, Status>(mappers::mapped_to_proto(&mapped, &result))
        })
        .await
        .map_err(|e| Status::internal(format!("Solve task failed: {}", e)))??;

        Ok(Response::new(report))
    }
}

impl Default for GrpcPlannerService {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

#[tonic::async_trait]
impl letsplan::planner_service_server::PlannerService for GrpcPlannerService {
    async fn solve_coverage(
        &self,
        request: Request<letsplan::CoverageRequest>,
    ) -> std::result::Result<Response<letsplan::SolveReport>, Status> {
        let input = mappers::proto_to_coverage(request.into_inner());
        self.run("coverage", move || coverage::build(&input)).await
    }

    async fn solve_blending(
        &self,
        request: Request<letsplan::BlendingRequest>,
    ) -> std::result::Result<Response<letsplan::SolveReport>, Status> {
        let input = mappers::proto_to_blending(request.into_inner()).map_err(|e| *e)?;
        self.run("blending", move || blending::build(&input)).await
    }

    async fn solve_transportation(
        &self,
        request: Request<letsplan::TransportationRequest>,
    ) -> std::result::Result<Response<letsplan::SolveReport>, Status> {
        let input = mappers::proto_to_transportation(request.into_inner());
        self.run("transportation", move || transportation::build(&input)).await
    }

    async fn get_available_solvers(
        &self,
        _request: Request<letsplan::Empty>,
    ) -> std::result::Result<Response<letsplan::AvailableSolvers>, Status> {
        let solvers = SolverFactory::available()
            .into_iter()
            .filter_map(|backend| SolverFactory::create_from_backend(backend).ok())
            .map(|solver| letsplan::SolverInfo {
                name: solver.name().to_string(),
                supports_mip: solver.supports_mip(),
            })
            .collect();

        Ok(Response::new(letsplan::AvailableSolvers { solvers }))
    }
}
