//! Message envelope shared by every cross-service hop
//!
//! Requests and responses travel as `{meta, data}` envelopes. Only the
//! correlation id is threaded through a request chain; each emitted response
//! carries the emitter's own timestamp and source.

use crate::error::{Result, ServiceError, ServiceResult};
use crate::types::{GetPlayerTournamentsQuery, JoinTournamentCommand};
use crate::utils::{current_timestamp, normalize_correlation_id};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Gateway → orchestrator command channel
pub const JOIN_TOURNAMENT_COMMAND_CHANNEL: &str = "tournament.join.command";
/// Gateway → orchestrator query channel
pub const GET_PLAYER_TOURNAMENTS_QUERY_CHANNEL: &str = "tournament.get-player-tournaments.query";
/// Orchestrator → directory lookup channel (enveloped traffic does not run here)
pub const USERS_GET_BY_ID_CHANNEL: &str = "users.get-by-id";

/// Source stamped by the gateway on outbound envelopes
pub const GATEWAY_SOURCE: &str = "gateway";
/// Source stamped by the orchestrator on response envelopes
pub const ORCHESTRATOR_SOURCE: &str = "tournament-orchestrator";
/// Fallback source when a caller leaves the field blank
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Distinguishes mutating from read-only traffic; carries no transactional meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Command,
    Query,
}

/// Envelope metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMeta {
    #[serde(default)]
    pub correlation_id: String,
    #[serde(default = "current_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<MessageType>,
}

impl MessageMeta {
    /// Build request metadata at the first hop, minting a correlation id when
    /// the caller supplied none.
    pub fn request(
        correlation_id: Option<&str>,
        source: &str,
        message_type: MessageType,
    ) -> Self {
        Self {
            correlation_id: normalize_correlation_id(correlation_id),
            timestamp: current_timestamp(),
            source: source.to_string(),
            message_type: Some(message_type),
        }
    }

    /// Normalize inbound metadata: trim or regenerate the correlation id,
    /// default a blank source, and fall back to the operation's message type.
    pub fn normalized(&self, fallback: MessageType) -> Self {
        let source = self.source.trim();
        Self {
            correlation_id: normalize_correlation_id(Some(&self.correlation_id)),
            timestamp: self.timestamp,
            source: if source.is_empty() {
                UNKNOWN_SOURCE.to_string()
            } else {
                source.to_string()
            },
            message_type: Some(self.message_type.unwrap_or(fallback)),
        }
    }

    /// Metadata for a response: same correlation id and message type, the
    /// responder's source, and a fresh timestamp.
    pub fn response(&self, source: &str) -> Self {
        Self {
            correlation_id: self.correlation_id.clone(),
            timestamp: current_timestamp(),
            source: source.to_string(),
            message_type: self.message_type,
        }
    }
}

/// The `{meta, data}` wrapper used on every cross-service message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<T> {
    pub meta: MessageMeta,
    pub data: T,
}

/// An envelope whose data is a tagged success/failure payload
pub type ResponseEnvelope<T> = MessageEnvelope<ServiceResult<T>>;

impl<T> MessageEnvelope<T> {
    pub fn new(meta: MessageMeta, data: T) -> Self {
        Self { meta, data }
    }
}

impl<T: Serialize> MessageEnvelope<T> {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("failed to serialize envelope")
    }
}

impl<T: serde::de::DeserializeOwned> MessageEnvelope<T> {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("failed to deserialize envelope")
    }
}

impl<T> ResponseEnvelope<T> {
    /// Success response preserving the request's correlation id
    pub fn success(request_meta: &MessageMeta, source: &str, data: T) -> Self {
        Self::new(request_meta.response(source), ServiceResult::ok(data))
    }

    /// Failure response preserving the request's correlation id
    pub fn failure(request_meta: &MessageMeta, source: &str, error: ServiceError) -> Self {
        Self::new(request_meta.response(source), ServiceResult::err(error))
    }
}

/// Validate a join command payload before dispatch
pub fn validate_join_command(data: &JoinTournamentCommand) -> std::result::Result<(), ServiceError> {
    let mut issues = Vec::new();

    if data.player_id.trim().is_empty() {
        issues.push("playerId must not be blank".to_string());
    }
    if data.game_type.trim().is_empty() {
        issues.push("gameType must not be blank".to_string());
    }
    if data.tournament_type.trim().is_empty() {
        issues.push("tournamentType must not be blank".to_string());
    }
    if data.entry_fee < 0 {
        issues.push("entryFee must not be negative".to_string());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::invalid_request(
            "Invalid join tournament command",
            issues,
        ))
    }
}

/// Validate a player-tournaments query payload before dispatch
pub fn validate_player_query(
    data: &GetPlayerTournamentsQuery,
) -> std::result::Result<(), ServiceError> {
    if data.player_id.trim().is_empty() {
        return Err(ServiceError::invalid_request(
            "Invalid player tournaments query",
            vec!["playerId must not be blank".to_string()],
        ));
    }
    Ok(())
}
