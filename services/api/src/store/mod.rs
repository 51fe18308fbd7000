//! Persistence layer: the `Ledger` trait and its two backends.
//!
//! `PgLedger` is the production backend (Postgres via sqlx); `MemLedger`
//! backs local development and tests. Both uphold the same contracts:
//! `total_points` moves only by atomic increment inside the record
//! operations, the daily limit is checked and the activity inserted in
//! one critical section, and (player, location) is unique forever.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CheckinActivity, Checkpoint, Location, LocationSubmission, Player};
use irl_address::ChainFamily;

/// Everything a record operation returns: the new activity row, the
/// player after the point increment, and the read-after-write sum of
/// today's points.
#[derive(Debug, Clone)]
pub struct CheckinOutcome {
    pub activity: CheckinActivity,
    pub player: Player,
    pub points_earned_today: i64,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Create-or-fetch a player keyed by (chain, address). A repeat
    /// touch may fill a missing email/username but never resets points.
    async fn get_or_create_player(
        &self,
        chain: ChainFamily,
        wallet_address: &str,
        email: Option<&str>,
        username: Option<&str>,
    ) -> Result<Player>;

    async fn find_player(&self, wallet_address: &str) -> Result<Option<Player>>;

    async fn get_checkpoint(&self, slug: &str) -> Result<Option<Checkpoint>>;

    /// Create-or-fetch a location by `place_id`. Locations first seen
    /// through a check-in are created visible.
    async fn get_or_create_location(&self, submission: &LocationSubmission) -> Result<Location>;

    /// Daily-limited checkpoint check-in. Counts today's checkpoint-path
    /// rows, applies the admission policy, and on allow inserts the
    /// activity and increments the player total, all atomically.
    async fn record_checkpoint_checkin(
        &self,
        player_id: Uuid,
        checkpoint: &Checkpoint,
        max_per_day: i64,
    ) -> Result<CheckinOutcome>;

    /// Once-ever location check-in. A repeat for the same
    /// (player, location) fails with `AlreadyCheckedIn`.
    async fn record_location_checkin(
        &self,
        player_id: Uuid,
        location: &Location,
        comment: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<CheckinOutcome>;

    /// Top players by all-time points, descending.
    async fn top_players(&self, limit: i64) -> Result<Vec<Player>>;

    /// Backend reachability probe for the health endpoint.
    async fn ping(&self) -> Result<()>;
}
