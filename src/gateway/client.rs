//! Gateway-side client for the tournament channels
//!
//! Wraps the request transport: builds request envelopes with gateway
//! metadata, applies the per-request deadline, and folds transport failures
//! into the same error shape domain failures arrive in.

use crate::error::{ErrorCode, ServiceError};
use crate::messaging::envelope::{
    MessageEnvelope, MessageMeta, MessageType, ResponseEnvelope,
    GET_PLAYER_TOURNAMENTS_QUERY_CHANNEL, GATEWAY_SOURCE, JOIN_TOURNAMENT_COMMAND_CHANNEL,
};
use crate::messaging::transport::{RequestTransport, TransportError};
use crate::types::{
    GetPlayerTournamentsQuery, GetPlayerTournamentsResult, JoinTournamentCommand,
    JoinTournamentResult,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

pub const ORCHESTRATOR_DEPENDENCY: &str = "tournament-orchestrator";

/// A gateway-facing failure: the error plus the correlation id to echo back
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    pub error: ServiceError,
    pub correlation_id: String,
}

impl ErrorResponse {
    fn new(error: ServiceError, correlation_id: &str) -> Self {
        Self {
            error,
            correlation_id: correlation_id.to_string(),
        }
    }
}

/// Client for the orchestrator's command and query channels
pub struct TournamentsClient {
    transport: Arc<dyn RequestTransport>,
    timeout: Duration,
}

impl TournamentsClient {
    pub fn new(transport: Arc<dyn RequestTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Dispatch a join command on behalf of an authenticated player
    pub async fn join_tournament(
        &self,
        correlation_id: Option<&str>,
        command: JoinTournamentCommand,
    ) -> Result<(JoinTournamentResult, String), ErrorResponse> {
        self.request(
            JOIN_TOURNAMENT_COMMAND_CHANNEL,
            MessageType::Command,
            correlation_id,
            command,
        )
        .await
    }

    /// Fetch the tournaments a player currently belongs to
    pub async fn player_tournaments(
        &self,
        correlation_id: Option<&str>,
        player_id: &str,
    ) -> Result<(GetPlayerTournamentsResult, String), ErrorResponse> {
        self.request(
            GET_PLAYER_TOURNAMENTS_QUERY_CHANNEL,
            MessageType::Query,
            correlation_id,
            GetPlayerTournamentsQuery {
                player_id: player_id.to_string(),
            },
        )
        .await
    }

    async fn request<T: Serialize, R: DeserializeOwned>(
        &self,
        channel: &str,
        message_type: MessageType,
        correlation_id: Option<&str>,
        data: T,
    ) -> Result<(R, String), ErrorResponse> {
        let meta = MessageMeta::request(correlation_id, GATEWAY_SOURCE, message_type);
        let correlation_id = meta.correlation_id.clone();

        let payload = match MessageEnvelope::new(meta, data).to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                error!(channel, "request encode failure: {e:#}");
                return Err(ErrorResponse::new(
                    ServiceError::internal("Failed to encode request"),
                    &correlation_id,
                ));
            }
        };

        let reply = match self.transport.request(channel, payload, self.timeout).await {
            Ok(reply) => reply,
            Err(TransportError::Timeout { timeout_ms, .. }) => {
                return Err(ErrorResponse::new(
                    ServiceError::dependency_timeout(ORCHESTRATOR_DEPENDENCY, timeout_ms),
                    &correlation_id,
                ));
            }
            Err(e) => {
                error!(channel, "transport failure: {e}");
                return Err(ErrorResponse::new(
                    ServiceError::new(
                        ErrorCode::InternalError,
                        "Tournament service is unavailable",
                    ),
                    &correlation_id,
                ));
            }
        };

        let response: ResponseEnvelope<R> = match MessageEnvelope::from_bytes(&reply) {
            Ok(response) => response,
            Err(e) => {
                error!(channel, "response decode failure: {e:#}");
                return Err(ErrorResponse::new(
                    ServiceError::internal("Failed to decode response"),
                    &correlation_id,
                ));
            }
        };

        // The response meta wins: a blank request correlation id was
        // regenerated downstream and that is the id worth surfacing.
        let correlation_id = response.meta.correlation_id;
        match response.data.into_result() {
            Ok(data) => Ok((data, correlation_id)),
            Err(error) => Err(ErrorResponse::new(error, &correlation_id)),
        }
    }
}
