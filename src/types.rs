//! Common types used throughout the tournament services
//!
//! Everything here crosses a service boundary, so the serde names follow the
//! camelCase wire contract shared by all three services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for players (opaque directory id)
pub type PlayerId = String;

/// Unique identifier for tournaments
pub type TournamentId = Uuid;

/// Capacity assigned to tournaments created by the matching transaction
pub const DEFAULT_MAX_PLAYERS: u32 = 4;

/// Profile returned by the player directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: PlayerId,
    pub username: String,
    pub display_name: String,
}

/// Request payload of the directory lookup RPC (no envelope on that hop)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLookupRequest {
    pub correlation_id: String,
    pub player_id: PlayerId,
}

/// The matching key grouping interchangeable tournaments
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCriteria {
    pub game_type: String,
    pub tournament_type: String,
    /// Entry fee in minor units; criteria matching requires exact equality
    pub entry_fee: i64,
}

impl std::fmt::Display for JoinCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.game_type, self.tournament_type, self.entry_fee
        )
    }
}

/// Data of the `tournament.join.command` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTournamentCommand {
    pub player_id: PlayerId,
    pub game_type: String,
    pub tournament_type: String,
    pub entry_fee: i64,
}

impl JoinTournamentCommand {
    pub fn criteria(&self) -> JoinCriteria {
        JoinCriteria {
            game_type: self.game_type.clone(),
            tournament_type: self.tournament_type.clone(),
            entry_fee: self.entry_fee,
        }
    }
}

/// Data of the `tournament.get-player-tournaments.query` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPlayerTournamentsQuery {
    pub player_id: PlayerId,
}

/// Derived tournament state; computed from membership counts, never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    Open,
    Full,
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentStatus::Open => write!(f, "open"),
            TournamentStatus::Full => write!(f, "full"),
        }
    }
}

/// One membership as exposed to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentPlayerSummary {
    pub player_id: PlayerId,
    pub username: String,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

/// One tournament as exposed to clients, members ordered by join time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSummary {
    pub tournament_id: TournamentId,
    pub game_type: String,
    pub tournament_type: String,
    pub entry_fee: i64,
    pub status: TournamentStatus,
    pub players_count: u32,
    pub max_players: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub players: Vec<TournamentPlayerSummary>,
}

/// Success payload of a join command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTournamentResult {
    pub tournament: TournamentSummary,
    pub joined_player: TournamentPlayerSummary,
}

/// Success payload of a player-tournaments query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPlayerTournamentsResult {
    pub player_id: PlayerId,
    pub tournaments: Vec<TournamentSummary>,
}
