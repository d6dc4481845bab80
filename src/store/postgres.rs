//! Postgres tournament store
//!
//! The matching transaction takes a pessimistic row lock (`FOR UPDATE`) on
//! each candidate before counting members; locks on skipped candidates are
//! released at transaction end. The lock only protects existing rows: two
//! concurrent first-joiners of a brand-new criteria tuple can each create a
//! tournament. The capacity invariant still holds per tournament; the
//! duplicate-creation window is carried as documented behavior.

use crate::error::Result;
use crate::store::{JoinOutcome, MembershipRecord, TournamentRecord, TournamentStore};
use crate::types::{JoinCriteria, TournamentId, UserProfile};
use crate::utils::{current_timestamp, generate_tournament_id};
use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{PgConnection, Row};
use tracing::debug;
use uuid::Uuid;

const SCHEMA: &str = include_str!("schema.sql");

/// Postgres-backed store
pub struct PostgresStore {
    pool: PgPool,
    max_players: u32,
}

impl PostgresStore {
    /// Connect and apply the idempotent schema bootstrap
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        max_players: u32,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .context("failed to apply tournament schema")?;

        Ok(Self { pool, max_players })
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

async fn load_tournament(
    conn: &mut PgConnection,
    id: TournamentId,
) -> Result<Option<TournamentRecord>> {
    let Some(row) = sqlx::query(
        "SELECT id, game_type, tournament_type, entry_fee, max_players, created_at, updated_at \
         FROM tournaments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    else {
        return Ok(None);
    };

    let members = sqlx::query(
        "SELECT player_id, username, display_name, joined_at \
         FROM tournament_players WHERE tournament_id = $1 ORDER BY joined_at ASC",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let players = members
        .iter()
        .map(|m| {
            Ok(MembershipRecord {
                player_id: m.try_get("player_id")?,
                username: m.try_get("username")?,
                display_name: m.try_get("display_name")?,
                joined_at: m.try_get("joined_at")?,
            })
        })
        .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;

    Ok(Some(TournamentRecord {
        id: row.try_get("id")?,
        game_type: row.try_get("game_type")?,
        tournament_type: row.try_get("tournament_type")?,
        entry_fee: row.try_get("entry_fee")?,
        max_players: row.try_get::<i32, _>("max_players")? as u32,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        players,
    }))
}

#[async_trait]
impl TournamentStore for PostgresStore {
    async fn join_tournament(
        &self,
        criteria: &JoinCriteria,
        user: &UserProfile,
    ) -> Result<JoinOutcome> {
        let mut tx = self.pool.begin().await?;

        // Existing-membership check across tournaments sharing the tuple.
        let existing = sqlx::query(
            "SELECT tp.id FROM tournament_players tp \
             JOIN tournaments t ON t.id = tp.tournament_id \
             WHERE tp.player_id = $1 AND t.game_type = $2 \
               AND t.tournament_type = $3 AND t.entry_fee = $4 \
             LIMIT 1",
        )
        .bind(&user.id)
        .bind(&criteria.game_type)
        .bind(&criteria.tournament_type)
        .bind(criteria.entry_fee)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            tx.rollback().await?;
            return Ok(JoinOutcome::AlreadyJoined);
        }

        // Candidate enumeration, oldest first.
        let candidate_rows = sqlx::query(
            "SELECT id FROM tournaments \
             WHERE game_type = $1 AND tournament_type = $2 AND entry_fee = $3 \
             ORDER BY created_at ASC",
        )
        .bind(&criteria.game_type)
        .bind(&criteria.tournament_type)
        .bind(criteria.entry_fee)
        .fetch_all(&mut *tx)
        .await?;

        // Locked capacity scan: lock, count, take the first with spare room.
        let mut selected: Option<TournamentId> = None;
        for candidate in &candidate_rows {
            let id: Uuid = candidate.try_get("id")?;

            let Some(locked) =
                sqlx::query("SELECT max_players FROM tournaments WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?
            else {
                continue;
            };
            let max_players: i32 = locked.try_get("max_players")?;

            let count: i64 =
                sqlx::query("SELECT COUNT(*) AS members FROM tournament_players WHERE tournament_id = $1")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?
                    .try_get("members")?;

            if count < max_players as i64 {
                selected = Some(id);
                break;
            }
        }

        let tournament_id = match selected {
            Some(id) => id,
            None => {
                let id = generate_tournament_id();
                let now = current_timestamp();
                sqlx::query(
                    "INSERT INTO tournaments \
                     (id, game_type, tournament_type, entry_fee, max_players, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(id)
                .bind(&criteria.game_type)
                .bind(&criteria.tournament_type)
                .bind(criteria.entry_fee)
                .bind(self.max_players as i32)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                debug!(tournament_id = %id, %criteria, "created tournament");
                id
            }
        };

        let joined_at = current_timestamp();
        let insert = sqlx::query(
            "INSERT INTO tournament_players \
             (id, tournament_id, player_id, username, display_name, joined_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(tournament_id)
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(joined_at)
        .execute(&mut *tx)
        .await;

        match insert {
            Ok(_) => {}
            // A concurrent transaction won the same slot first.
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await.ok();
                return Ok(JoinOutcome::AlreadyJoined);
            }
            Err(e) => return Err(e.into()),
        }

        sqlx::query("UPDATE tournaments SET updated_at = $2 WHERE id = $1")
            .bind(tournament_id)
            .bind(joined_at)
            .execute(&mut *tx)
            .await?;

        let tournament = load_tournament(&mut tx, tournament_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("tournament {tournament_id} vanished mid-transaction"))?;

        tx.commit().await?;

        let player = MembershipRecord {
            player_id: user.id.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            joined_at,
        };

        Ok(JoinOutcome::Joined { tournament, player })
    }

    async fn player_tournaments(&self, player_id: &str) -> Result<Vec<TournamentRecord>> {
        let mut conn = self.pool.acquire().await?;

        let id_rows = sqlx::query(
            "SELECT t.id FROM tournaments t \
             JOIN tournament_players tp ON tp.tournament_id = t.id \
             WHERE tp.player_id = $1 \
             ORDER BY t.created_at ASC",
        )
        .bind(player_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut tournaments = Vec::with_capacity(id_rows.len());
        for row in &id_rows {
            let id: Uuid = row.try_get("id")?;
            if let Some(tournament) = load_tournament(&mut conn, id).await? {
                tournaments.push(tournament);
            }
        }
        Ok(tournaments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Transactional behavior against a live database is covered by the
    // in-memory store tests (same trait semantics) and deployment smoke
    // tests; here we pin the schema contract.

    #[test]
    fn schema_enforces_membership_uniqueness() {
        assert!(SCHEMA.contains("UNIQUE (tournament_id, player_id)"));
    }

    #[test]
    fn schema_indexes_the_matching_lookup() {
        assert!(SCHEMA.contains("ix_tournaments_matching_lookup"));
        assert!(SCHEMA.contains("(game_type, tournament_type, entry_fee, created_at)"));
    }

    #[test]
    fn schema_bootstrap_is_idempotent() {
        assert!(SCHEMA.matches("IF NOT EXISTS").count() >= 4);
    }
}
