//! Public HTTP gateway: auth, channel client, axum routes

pub mod auth;
pub mod client;
pub mod http;

pub use auth::{InMemoryTokenIssuer, TokenVerifier};
pub use client::TournamentsClient;
pub use http::{router, GatewayState};
