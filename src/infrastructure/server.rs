// Infrastructure: Server setup and configuration

use std::net::SocketAddr;

use tonic::transport::Server;
use tracing::info;

use crate::application::mappers::letsplan::planner_service_server::PlannerServiceServer;
use crate::application::GrpcPlannerService;
use crate::domain::SolverConfig;
use crate::solver::SolverFactory;

pub struct ServerConfig {
    pub address: SocketAddr,
    pub solver: SolverConfig,
}

impl ServerConfig {
    pub const ADDRESS_VAR: &'static str = "LETSPLAN_ADDR";
    pub const DEFAULT_ADDRESS: &'static str = "0.0.0.0:50051";

    pub fn new(address: SocketAddr, solver: SolverConfig) -> Self {
        Self { address, solver }
    }

    /// Read the listen address and solver settings from the environment
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::env::var(Self::ADDRESS_VAR)
            .unwrap_or_else(|_| Self::DEFAULT_ADDRESS.to_string());
        let address = raw
            .parse::<SocketAddr>()
            .map_err(|e| format!("invalid {} '{}': {}", Self::ADDRESS_VAR, raw, e))?;
        Ok(Self::new(address, SolverConfig::from_env()))
    }
}

pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Fail at startup rather than on the first request
    let solver = SolverFactory::create(&config.solver)?;
    info!(
        address = %config.address,
        solver = solver.name(),
        available = ?SolverFactory::available(),
        "starting planner service"
    );

    let service = GrpcPlannerService::new(config.solver);

    Server::builder()
        .add_service(PlannerServiceServer::new(service))
        .serve(config.address)
        .await?;

    Ok(())
}
