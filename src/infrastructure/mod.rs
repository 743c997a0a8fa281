// Infrastructure layer: server lifecycle
pub mod server;

pub use server::{start_server, ServerConfig};
