//! In-memory tournament store
//!
//! Runs the whole matching transaction under a single async mutex, which gives
//! it the same observable semantics as the Postgres store's row locks (and a
//! stronger guarantee for brand-new criteria tuples: the first-joiner race
//! that can duplicate tournaments in Postgres cannot occur here).

use crate::error::Result;
use crate::store::{JoinOutcome, MembershipRecord, TournamentRecord, TournamentStore};
use crate::types::{JoinCriteria, TournamentId, UserProfile, DEFAULT_MAX_PLAYERS};
use crate::utils::{current_timestamp, generate_tournament_id};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
struct TournamentRow {
    id: TournamentId,
    game_type: String,
    tournament_type: String,
    entry_fee: i64,
    max_players: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct MembershipRow {
    tournament_id: TournamentId,
    player_id: String,
    username: String,
    display_name: String,
    joined_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    tournaments: Vec<TournamentRow>,
    memberships: Vec<MembershipRow>,
}

/// Row counts, mainly for tests asserting that failed joins left no trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStoreStats {
    pub tournaments: usize,
    pub memberships: usize,
}

/// In-memory store; cheap to clone via `Arc`
pub struct MemoryStore {
    tables: Mutex<Tables>,
    max_players: u32,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_players(DEFAULT_MAX_PLAYERS)
    }

    pub fn with_max_players(max_players: u32) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            max_players,
        }
    }

    pub async fn stats(&self) -> MemoryStoreStats {
        let tables = self.tables.lock().await;
        MemoryStoreStats {
            tournaments: tables.tournaments.len(),
            memberships: tables.memberships.len(),
        }
    }

    /// Every tournament with its members, ordered like the query path
    pub async fn all_tournaments(&self) -> Vec<TournamentRecord> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<&TournamentRow> = tables.tournaments.iter().collect();
        rows.sort_by_key(|row| row.created_at);
        rows.iter().map(|row| build_record(&tables, row)).collect()
    }
}

fn row_matches(row: &TournamentRow, criteria: &JoinCriteria) -> bool {
    row.game_type == criteria.game_type
        && row.tournament_type == criteria.tournament_type
        && row.entry_fee == criteria.entry_fee
}

fn member_count(tables: &Tables, tournament_id: TournamentId) -> usize {
    tables
        .memberships
        .iter()
        .filter(|m| m.tournament_id == tournament_id)
        .count()
}

fn build_record(tables: &Tables, row: &TournamentRow) -> TournamentRecord {
    let mut players: Vec<MembershipRecord> = tables
        .memberships
        .iter()
        .filter(|m| m.tournament_id == row.id)
        .map(|m| MembershipRecord {
            player_id: m.player_id.clone(),
            username: m.username.clone(),
            display_name: m.display_name.clone(),
            joined_at: m.joined_at,
        })
        .collect();
    players.sort_by_key(|p| p.joined_at);

    TournamentRecord {
        id: row.id,
        game_type: row.game_type.clone(),
        tournament_type: row.tournament_type.clone(),
        entry_fee: row.entry_fee,
        max_players: row.max_players,
        created_at: row.created_at,
        updated_at: row.updated_at,
        players,
    }
}

#[async_trait]
impl TournamentStore for MemoryStore {
    async fn join_tournament(
        &self,
        criteria: &JoinCriteria,
        user: &UserProfile,
    ) -> Result<JoinOutcome> {
        let mut tables = self.tables.lock().await;

        // Existing-membership check across all tournaments sharing the tuple.
        let already_joined = tables.memberships.iter().any(|m| {
            m.player_id == user.id
                && tables
                    .tournaments
                    .iter()
                    .any(|t| t.id == m.tournament_id && row_matches(t, criteria))
        });
        if already_joined {
            return Ok(JoinOutcome::AlreadyJoined);
        }

        // Oldest-first fill policy over matching candidates.
        let mut candidates: Vec<(TournamentId, DateTime<Utc>)> = tables
            .tournaments
            .iter()
            .filter(|t| row_matches(t, criteria))
            .map(|t| (t.id, t.created_at))
            .collect();
        candidates.sort_by_key(|(_, created_at)| *created_at);

        let selected = candidates.iter().find_map(|(id, _)| {
            let row = tables.tournaments.iter().find(|t| t.id == *id)?;
            ((member_count(&tables, *id) as u32) < row.max_players).then_some(*id)
        });

        let tournament_id = match selected {
            Some(id) => id,
            None => {
                let now = current_timestamp();
                let row = TournamentRow {
                    id: generate_tournament_id(),
                    game_type: criteria.game_type.clone(),
                    tournament_type: criteria.tournament_type.clone(),
                    entry_fee: criteria.entry_fee,
                    max_players: self.max_players,
                    created_at: now,
                    updated_at: now,
                };
                debug!(tournament_id = %row.id, %criteria, "creating tournament");
                let id = row.id;
                tables.tournaments.push(row);
                id
            }
        };

        // Mirrors the unique constraint on (tournament_id, player_id).
        if tables
            .memberships
            .iter()
            .any(|m| m.tournament_id == tournament_id && m.player_id == user.id)
        {
            return Ok(JoinOutcome::AlreadyJoined);
        }

        let membership = MembershipRow {
            tournament_id,
            player_id: user.id.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            joined_at: current_timestamp(),
        };
        let player = MembershipRecord {
            player_id: membership.player_id.clone(),
            username: membership.username.clone(),
            display_name: membership.display_name.clone(),
            joined_at: membership.joined_at,
        };
        tables.memberships.push(membership);

        let updated_at = current_timestamp();
        if let Some(row) = tables
            .tournaments
            .iter_mut()
            .find(|t| t.id == tournament_id)
        {
            row.updated_at = updated_at;
        }

        let row = tables
            .tournaments
            .iter()
            .find(|t| t.id == tournament_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("selected tournament {tournament_id} disappeared"))?;
        let tournament = build_record(&tables, &row);

        Ok(JoinOutcome::Joined { tournament, player })
    }

    async fn player_tournaments(&self, player_id: &str) -> Result<Vec<TournamentRecord>> {
        let tables = self.tables.lock().await;

        let mut rows: Vec<&TournamentRow> = tables
            .tournaments
            .iter()
            .filter(|t| {
                tables
                    .memberships
                    .iter()
                    .any(|m| m.tournament_id == t.id && m.player_id == player_id)
            })
            .collect();
        rows.sort_by_key(|row| row.created_at);

        Ok(rows.iter().map(|row| build_record(&tables, row)).collect())
    }
}
