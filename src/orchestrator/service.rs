//! Tournament orchestration
//!
//! Receives join commands and player-tournament queries, resolves the player
//! through the directory, runs the matching transaction (or the read-only
//! query), and builds the response envelope. Domain failures always travel as
//! `ok: false` payloads, never as faults across the broker boundary.

use crate::directory::DirectoryClient;
use crate::error::{ErrorCode, ServiceError};
use crate::messaging::envelope::{
    validate_join_command, validate_player_query, MessageEnvelope, MessageType, ResponseEnvelope,
    ORCHESTRATOR_SOURCE,
};
use crate::store::{JoinOutcome, TournamentStore};
use crate::types::{
    GetPlayerTournamentsQuery, GetPlayerTournamentsResult, JoinTournamentCommand,
    JoinTournamentResult,
};
use std::sync::Arc;
use tracing::{error, info};

/// Orchestrator context: directory client, storage handle
pub struct Orchestrator {
    directory: DirectoryClient,
    store: Arc<dyn TournamentStore>,
}

impl Orchestrator {
    pub fn new(directory: DirectoryClient, store: Arc<dyn TournamentStore>) -> Self {
        Self { directory, store }
    }

    /// Handle a `tournament.join.command` envelope
    pub async fn join_tournament(
        &self,
        envelope: MessageEnvelope<JoinTournamentCommand>,
    ) -> ResponseEnvelope<JoinTournamentResult> {
        let meta = envelope.meta.normalized(MessageType::Command);
        let data = envelope.data;

        info!(
            correlation_id = %meta.correlation_id,
            player_id = %data.player_id,
            game_type = %data.game_type,
            tournament_type = %data.tournament_type,
            entry_fee = data.entry_fee,
            "join tournament command"
        );

        if let Err(error) = validate_join_command(&data) {
            return ResponseEnvelope::failure(&meta, ORCHESTRATOR_SOURCE, error);
        }

        // Resolve the player first; on failure the matching transaction
        // never runs.
        let user = match self
            .directory
            .resolve_user(&meta.correlation_id, &data.player_id)
            .await
            .into_result()
        {
            Ok(user) => user,
            Err(error) => return ResponseEnvelope::failure(&meta, ORCHESTRATOR_SOURCE, error),
        };

        let outcome = match self.store.join_tournament(&data.criteria(), &user).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    correlation_id = %meta.correlation_id,
                    "join tournament persistence failure: {e:#}"
                );
                return ResponseEnvelope::failure(
                    &meta,
                    ORCHESTRATOR_SOURCE,
                    ServiceError::internal("Failed to persist tournament join"),
                );
            }
        };

        match outcome {
            JoinOutcome::AlreadyJoined => ResponseEnvelope::failure(
                &meta,
                ORCHESTRATOR_SOURCE,
                ServiceError::new(
                    ErrorCode::PlayerAlreadyJoined,
                    "Player already joined a matching tournament",
                ),
            ),
            JoinOutcome::Joined { tournament, player } => ResponseEnvelope::success(
                &meta,
                ORCHESTRATOR_SOURCE,
                JoinTournamentResult {
                    tournament: tournament.to_summary(),
                    joined_player: player.to_summary(),
                },
            ),
        }
    }

    /// Handle a `tournament.get-player-tournaments.query` envelope
    pub async fn get_player_tournaments(
        &self,
        envelope: MessageEnvelope<GetPlayerTournamentsQuery>,
    ) -> ResponseEnvelope<GetPlayerTournamentsResult> {
        let meta = envelope.meta.normalized(MessageType::Query);
        let data = envelope.data;

        info!(
            correlation_id = %meta.correlation_id,
            player_id = %data.player_id,
            "get player tournaments query"
        );

        if let Err(error) = validate_player_query(&data) {
            return ResponseEnvelope::failure(&meta, ORCHESTRATOR_SOURCE, error);
        }

        match self.store.player_tournaments(&data.player_id).await {
            Ok(tournaments) => ResponseEnvelope::success(
                &meta,
                ORCHESTRATOR_SOURCE,
                GetPlayerTournamentsResult {
                    player_id: data.player_id,
                    tournaments: tournaments.iter().map(|t| t.to_summary()).collect(),
                },
            ),
            Err(e) => {
                error!(
                    correlation_id = %meta.correlation_id,
                    "get player tournaments persistence failure: {e:#}"
                );
                ResponseEnvelope::failure(
                    &meta,
                    ORCHESTRATOR_SOURCE,
                    ServiceError::internal("Failed to fetch player tournaments"),
                )
            }
        }
    }
}
