//! Postgres ledger backed by sqlx.
//!
//! Concurrency contracts: each record operation runs in one transaction
//! that locks the player row (`SELECT ... FOR UPDATE`) before counting,
//! so two simultaneous check-ins by the same player serialize; the point
//! update is an in-place `total_points = total_points + $delta`; the
//! once-ever location rule is a partial unique index, with the
//! unique-violation mapped to `AlreadyCheckedIn` at the error boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Postgres;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    CheckinActivity, Checkpoint, Location, LocationSubmission, Player, KIND_CHECKPOINT,
    KIND_LOCATION,
};
use crate::policy::{self, Decision};
use crate::store::{CheckinOutcome, Ledger};
use irl_address::ChainFamily;

pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// Connects and applies pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Persistence(format!("migration failed: {e}")))?;
        Ok(Self { pool })
    }

    async fn lock_player(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        player_id: Uuid,
    ) -> Result<Player> {
        sqlx::query_as::<_, Player>("SELECT * FROM players WHERE id = $1 FOR UPDATE")
            .bind(player_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(AppError::PlayerNotFound)
    }

    async fn insert_activity(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        player_id: Uuid,
        target_kind: &str,
        target_id: Uuid,
        points: i64,
        comment: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<CheckinActivity> {
        let activity = sqlx::query_as::<_, CheckinActivity>(
            "INSERT INTO checkin_activities \
               (id, player_id, target_kind, target_id, points_earned, comment, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(player_id)
        .bind(target_kind)
        .bind(target_id)
        .bind(points)
        .bind(comment)
        .bind(image_url)
        .fetch_one(&mut **tx)
        .await?;
        Ok(activity)
    }

    async fn increment_total(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        player_id: Uuid,
        delta: i64,
    ) -> Result<Player> {
        let player = sqlx::query_as::<_, Player>(
            "UPDATE players SET total_points = total_points + $2 WHERE id = $1 RETURNING *",
        )
        .bind(player_id)
        .bind(delta)
        .fetch_one(&mut **tx)
        .await?;
        Ok(player)
    }

    async fn points_earned_today(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        player_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64> {
        let sum = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(points_earned), 0)::BIGINT FROM checkin_activities \
             WHERE player_id = $1 AND created_at >= $2 AND created_at < $3",
        )
        .bind(player_id)
        .bind(start)
        .bind(end)
        .fetch_one(&mut **tx)
        .await?;
        Ok(sum)
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn get_or_create_player(
        &self,
        chain: ChainFamily,
        wallet_address: &str,
        email: Option<&str>,
        username: Option<&str>,
    ) -> Result<Player> {
        // Upsert in one statement; a repeat touch only fills missing
        // contact fields and never touches total_points.
        let player = sqlx::query_as::<_, Player>(
            "INSERT INTO players (id, chain, wallet_address, email, username) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (chain, wallet_address) DO UPDATE SET \
               email = COALESCE(players.email, EXCLUDED.email), \
               username = COALESCE(players.username, EXCLUDED.username) \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(chain.as_str())
        .bind(wallet_address)
        .bind(email)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(player)
    }

    async fn find_player(&self, wallet_address: &str) -> Result<Option<Player>> {
        let player = sqlx::query_as::<_, Player>(
            "SELECT * FROM players WHERE wallet_address = $1 LIMIT 1",
        )
        .bind(wallet_address)
        .fetch_optional(&self.pool)
        .await?;
        Ok(player)
    }

    async fn get_checkpoint(&self, slug: &str) -> Result<Option<Checkpoint>> {
        let checkpoint =
            sqlx::query_as::<_, Checkpoint>("SELECT * FROM checkpoints WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;
        Ok(checkpoint)
    }

    async fn get_or_create_location(&self, submission: &LocationSubmission) -> Result<Location> {
        // DO UPDATE with a no-op assignment so RETURNING always yields
        // the row, created or pre-existing; visibility is preserved.
        let location = sqlx::query_as::<_, Location>(
            "INSERT INTO locations (id, place_id, name, lat, lon, kind, is_visible, points_value) \
             VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7) \
             ON CONFLICT (place_id) DO UPDATE SET place_id = EXCLUDED.place_id \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&submission.place_id)
        .bind(&submission.name)
        .bind(submission.lat)
        .bind(submission.lon)
        .bind(&submission.kind)
        .bind(submission.points_value)
        .fetch_one(&self.pool)
        .await?;
        Ok(location)
    }

    async fn record_checkpoint_checkin(
        &self,
        player_id: Uuid,
        checkpoint: &Checkpoint,
        max_per_day: i64,
    ) -> Result<CheckinOutcome> {
        let (start, end) = policy::utc_day_bounds(Utc::now());
        let mut tx = self.pool.begin().await?;

        Self::lock_player(&mut tx, player_id).await?;
        let today = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM checkin_activities \
             WHERE player_id = $1 AND target_kind = $2 \
               AND created_at >= $3 AND created_at < $4",
        )
        .bind(player_id)
        .bind(KIND_CHECKPOINT)
        .bind(start)
        .bind(end)
        .fetch_one(&mut *tx)
        .await?;

        let points_awarded = match policy::decide(today, max_per_day, checkpoint.points_value) {
            Decision::Deny { .. } => return Err(AppError::DailyLimitReached),
            Decision::Allow { points_awarded } => points_awarded,
        };

        let activity = Self::insert_activity(
            &mut tx,
            player_id,
            KIND_CHECKPOINT,
            checkpoint.id,
            points_awarded,
            None,
            None,
        )
        .await?;
        let player = Self::increment_total(&mut tx, player_id, points_awarded).await?;
        let points_earned_today = Self::points_earned_today(&mut tx, player_id, start, end).await?;

        tx.commit().await?;
        Ok(CheckinOutcome {
            activity,
            player,
            points_earned_today,
        })
    }

    async fn record_location_checkin(
        &self,
        player_id: Uuid,
        location: &Location,
        comment: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<CheckinOutcome> {
        let (start, end) = policy::utc_day_bounds(Utc::now());
        let mut tx = self.pool.begin().await?;

        Self::lock_player(&mut tx, player_id).await?;
        // The partial unique index on (player_id, target_id) for location
        // rows turns a replay into a 23505, surfaced as AlreadyCheckedIn.
        let activity = Self::insert_activity(
            &mut tx,
            player_id,
            KIND_LOCATION,
            location.id,
            location.points_value,
            comment,
            image_url,
        )
        .await?;
        let player = Self::increment_total(&mut tx, player_id, location.points_value).await?;
        let points_earned_today = Self::points_earned_today(&mut tx, player_id, start, end).await?;

        tx.commit().await?;
        Ok(CheckinOutcome {
            activity,
            player,
            points_earned_today,
        })
    }

    async fn top_players(&self, limit: i64) -> Result<Vec<Player>> {
        let players = sqlx::query_as::<_, Player>(
            "SELECT * FROM players ORDER BY total_points DESC, created_at ASC LIMIT $1",
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(players)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
