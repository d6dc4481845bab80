//! Channel dispatch for the orchestrator
//!
//! Binds the two tournament channels to [`Orchestrator`] operations. Payloads
//! that fail to decode as an envelope still get an `InvalidRequest` reply so
//! the caller is never left waiting on a malformed message.

use crate::error::{ErrorCode, Result, ServiceError};
use crate::messaging::envelope::{
    MessageEnvelope, MessageMeta, MessageType, ResponseEnvelope,
    GET_PLAYER_TOURNAMENTS_QUERY_CHANNEL, JOIN_TOURNAMENT_COMMAND_CHANNEL, ORCHESTRATOR_SOURCE,
};
use crate::messaging::transport::RequestHandler;
use crate::orchestrator::Orchestrator;
use anyhow::bail;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub struct OrchestratorHandler {
    orchestrator: Arc<Orchestrator>,
}

impl OrchestratorHandler {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Reply for a payload that is not a decodable envelope. The request's
    /// correlation id is unrecoverable, so a fresh one is minted.
    fn malformed_reply(message_type: MessageType) -> ResponseEnvelope<serde_json::Value> {
        ResponseEnvelope::failure(
            &MessageMeta::request(None, ORCHESTRATOR_SOURCE, message_type),
            ORCHESTRATOR_SOURCE,
            ServiceError::new(
                ErrorCode::InvalidRequest,
                "Message payload is not a valid envelope",
            ),
        )
    }
}

#[async_trait]
impl RequestHandler for OrchestratorHandler {
    async fn handle(&self, channel: &str, payload: &[u8]) -> Result<Vec<u8>> {
        match channel {
            JOIN_TOURNAMENT_COMMAND_CHANNEL => match MessageEnvelope::from_bytes(payload) {
                Ok(envelope) => self.orchestrator.join_tournament(envelope).await.to_bytes(),
                Err(e) => {
                    warn!(channel, "undecodable join command: {e:#}");
                    Self::malformed_reply(MessageType::Command).to_bytes()
                }
            },
            GET_PLAYER_TOURNAMENTS_QUERY_CHANNEL => match MessageEnvelope::from_bytes(payload) {
                Ok(envelope) => self
                    .orchestrator
                    .get_player_tournaments(envelope)
                    .await
                    .to_bytes(),
                Err(e) => {
                    warn!(channel, "undecodable player tournaments query: {e:#}");
                    Self::malformed_reply(MessageType::Query).to_bytes()
                }
            },
            other => bail!("no operation bound to channel {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectoryClient, DirectoryService};
    use crate::messaging::envelope::USERS_GET_BY_ID_CHANNEL;
    use crate::messaging::transport::InProcessTransport;
    use crate::store::MemoryStore;
    use crate::types::{JoinTournamentCommand, JoinTournamentResult};
    use std::time::Duration;

    async fn handler() -> OrchestratorHandler {
        let transport = Arc::new(InProcessTransport::new());
        transport
            .register(USERS_GET_BY_ID_CHANNEL, Arc::new(DirectoryService::seeded()))
            .await;

        OrchestratorHandler::new(Arc::new(Orchestrator::new(
            DirectoryClient::new(transport, Duration::from_secs(1)),
            Arc::new(MemoryStore::new()),
        )))
    }

    #[tokio::test]
    async fn join_command_round_trips_through_the_handler() {
        let handler = handler().await;

        let request = MessageEnvelope::new(
            MessageMeta::request(Some("corr-1"), "gateway", MessageType::Command),
            JoinTournamentCommand {
                player_id: "user2".to_string(),
                game_type: "poker".to_string(),
                tournament_type: "duo".to_string(),
                entry_fee: 25,
            },
        );

        let reply = handler
            .handle(JOIN_TOURNAMENT_COMMAND_CHANNEL, &request.to_bytes().unwrap())
            .await
            .unwrap();

        let response: ResponseEnvelope<JoinTournamentResult> =
            MessageEnvelope::from_bytes(&reply).unwrap();
        assert_eq!(response.meta.correlation_id, "corr-1");
        assert_eq!(
            response.data.into_result().unwrap().joined_player.username,
            "bob"
        );
    }

    #[tokio::test]
    async fn garbage_payload_gets_an_invalid_request_reply() {
        let handler = handler().await;

        let reply = handler
            .handle(JOIN_TOURNAMENT_COMMAND_CHANNEL, b"not-json")
            .await
            .unwrap();

        let response: ResponseEnvelope<serde_json::Value> =
            MessageEnvelope::from_bytes(&reply).unwrap();
        let error = response.data.into_result().unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidRequest);
        assert!(!response.meta.correlation_id.is_empty());
    }

    #[tokio::test]
    async fn unbound_channel_is_a_handler_error() {
        let handler = handler().await;
        assert!(handler.handle("tournament.unknown", b"{}").await.is_err());
    }
}
