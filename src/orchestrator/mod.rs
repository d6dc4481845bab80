//! Join-command and query orchestration

pub mod handlers;
pub mod service;

pub use handlers::OrchestratorHandler;
pub use service::Orchestrator;
