//! Tourney Hall - Tournament matchmaking microservice
//!
//! This crate provides request/reply tournament matchmaking over AMQP: an
//! HTTP gateway, a tournament orchestrator with find-or-create-and-join
//! semantics, and a player directory, sharing one envelope protocol and
//! error taxonomy.

pub mod config;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod messaging;
pub mod orchestrator;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{ErrorCode, Result, ServiceError, ServiceResult};
pub use types::*;

// Re-export key components
pub use messaging::envelope::{MessageEnvelope, ResponseEnvelope};
pub use orchestrator::Orchestrator;
pub use store::{MemoryStore, TournamentStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
