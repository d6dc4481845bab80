//! Tournament storage: the find-or-create-and-join matching transaction
//!
//! Two implementations share one trait: a Postgres store for production and an
//! in-memory store with the same semantics for tests and single-process runs.

pub mod memory;
pub mod postgres;

use crate::error::Result;
use crate::types::{
    JoinCriteria, TournamentId, TournamentPlayerSummary, TournamentStatus, TournamentSummary,
    UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// One membership row
#[derive(Debug, Clone)]
pub struct MembershipRecord {
    pub player_id: String,
    pub username: String,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

impl MembershipRecord {
    pub fn to_summary(&self) -> TournamentPlayerSummary {
        TournamentPlayerSummary {
            player_id: self.player_id.clone(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            joined_at: self.joined_at,
        }
    }
}

/// One tournament row with its members, ordered by join time
#[derive(Debug, Clone)]
pub struct TournamentRecord {
    pub id: TournamentId,
    pub game_type: String,
    pub tournament_type: String,
    pub entry_fee: i64,
    pub max_players: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub players: Vec<MembershipRecord>,
}

impl TournamentRecord {
    /// Derived state; never persisted
    pub fn status(&self) -> TournamentStatus {
        if self.players.len() as u32 >= self.max_players {
            TournamentStatus::Full
        } else {
            TournamentStatus::Open
        }
    }

    pub fn matches(&self, criteria: &JoinCriteria) -> bool {
        self.game_type == criteria.game_type
            && self.tournament_type == criteria.tournament_type
            && self.entry_fee == criteria.entry_fee
    }

    pub fn to_summary(&self) -> TournamentSummary {
        TournamentSummary {
            tournament_id: self.id,
            game_type: self.game_type.clone(),
            tournament_type: self.tournament_type.clone(),
            entry_fee: self.entry_fee,
            status: self.status(),
            players_count: self.players.len() as u32,
            max_players: self.max_players,
            created_at: self.created_at,
            updated_at: self.updated_at,
            players: self.players.iter().map(|p| p.to_summary()).collect(),
        }
    }
}

/// Result of the matching transaction
#[derive(Debug)]
pub enum JoinOutcome {
    /// The player was placed; carries the reloaded tournament and the new row
    Joined {
        tournament: TournamentRecord,
        player: MembershipRecord,
    },
    /// A membership for this player and criteria tuple already exists
    AlreadyJoined,
}

/// Storage seam for the matching transaction and the read-only query path
#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Atomically find an open tournament matching the criteria (oldest
    /// first), or create one, and record the player's membership.
    async fn join_tournament(
        &self,
        criteria: &JoinCriteria,
        user: &UserProfile,
    ) -> Result<JoinOutcome>;

    /// All tournaments holding a membership for the player, ordered by
    /// tournament creation time, members by join time. No locking; the result
    /// may trail in-flight joins.
    async fn player_tournaments(&self, player_id: &str) -> Result<Vec<TournamentRecord>>;
}
