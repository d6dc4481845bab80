//! Player directory: RPC client and the lookup service itself

pub mod client;
pub mod service;

pub use client::DirectoryClient;
pub use service::DirectoryService;
