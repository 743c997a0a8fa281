// Solver adapters module

pub mod adapter;
pub mod factory;
#[cfg(any(feature = "microlp", feature = "coin_cbc"))]
pub mod good_lp_solver;
#[cfg(feature = "highs")]
pub mod highs_solver;

pub use adapter::{Backend, BackendError, BackendStatus, SessionFactory, SolverAdapter};
pub use factory::SolverFactory;
#[cfg(any(feature = "microlp", feature = "coin_cbc"))]
pub use good_lp_solver::{GoodLpEngine, GoodLpSolver};
#[cfg(feature = "highs")]
pub use highs_solver::HighsSolver;
