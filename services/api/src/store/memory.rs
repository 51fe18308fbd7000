//! In-memory ledger for local development and tests.
//!
//! One `RwLock` over the whole state; every record operation runs under
//! the write lock, which is what makes the count-then-insert and the
//! point increment atomic in this backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::SeedCheckpoint;
use crate::error::{AppError, Result};
use crate::models::{
    CheckinActivity, Checkpoint, Location, LocationSubmission, Player, KIND_CHECKPOINT,
    KIND_LOCATION,
};
use crate::policy::{self, Decision};
use crate::store::{CheckinOutcome, Ledger};
use irl_address::ChainFamily;

#[derive(Default)]
struct State {
    players: HashMap<Uuid, Player>,
    /// (chain, wallet_address) → player id.
    player_ids: HashMap<(String, String), Uuid>,
    /// slug → checkpoint.
    checkpoints: HashMap<String, Checkpoint>,
    /// place_id → location.
    locations: HashMap<String, Location>,
    activities: Vec<CheckinActivity>,
}

#[derive(Default)]
pub struct MemLedger {
    inner: RwLock<State>,
}

impl MemLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a checkpoint (startup seeding from config).
    pub async fn seed_checkpoint(&self, seed: &SeedCheckpoint) -> Checkpoint {
        let checkpoint = Checkpoint {
            id: Uuid::new_v4(),
            slug: seed.slug.clone(),
            name: seed.name.clone(),
            chain: seed.chain.clone(),
            points_value: seed.points_value,
            is_active: true,
            created_at: Utc::now(),
        };
        let mut state = self.inner.write().await;
        state
            .checkpoints
            .insert(checkpoint.slug.clone(), checkpoint.clone());
        checkpoint
    }

    #[cfg(test)]
    pub(crate) async fn seed_location(&self, location: Location) {
        let mut state = self.inner.write().await;
        state.locations.insert(location.place_id.clone(), location);
    }

    #[cfg(test)]
    pub(crate) async fn set_checkpoint_active(&self, slug: &str, is_active: bool) {
        let mut state = self.inner.write().await;
        if let Some(cp) = state.checkpoints.get_mut(slug) {
            cp.is_active = is_active;
        }
    }
}

impl State {
    fn checkpoint_checkins_today(&self, player_id: Uuid) -> i64 {
        let (start, end) = policy::utc_day_bounds(Utc::now());
        self.activities
            .iter()
            .filter(|a| {
                a.player_id == player_id
                    && a.target_kind == KIND_CHECKPOINT
                    && a.created_at >= start
                    && a.created_at < end
            })
            .count() as i64
    }

    fn points_earned_today(&self, player_id: Uuid) -> i64 {
        let (start, end) = policy::utc_day_bounds(Utc::now());
        self.activities
            .iter()
            .filter(|a| a.player_id == player_id && a.created_at >= start && a.created_at < end)
            .map(|a| a.points_earned)
            .sum()
    }

    fn apply_checkin(
        &mut self,
        player_id: Uuid,
        target_kind: &str,
        target_id: Uuid,
        points: i64,
        comment: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<CheckinOutcome> {
        let activity = CheckinActivity {
            id: Uuid::new_v4(),
            player_id,
            target_kind: target_kind.to_string(),
            target_id,
            points_earned: points,
            comment: comment.map(str::to_string),
            image_url: image_url.map(str::to_string),
            created_at: Utc::now(),
        };
        self.activities.push(activity.clone());

        let player = self
            .players
            .get_mut(&player_id)
            .ok_or_else(|| AppError::Persistence(format!("player {player_id} missing")))?;
        player.total_points += points;
        let player = player.clone();

        let points_earned_today = self.points_earned_today(player_id);
        Ok(CheckinOutcome {
            activity,
            player,
            points_earned_today,
        })
    }
}

#[async_trait]
impl Ledger for MemLedger {
    async fn get_or_create_player(
        &self,
        chain: ChainFamily,
        wallet_address: &str,
        email: Option<&str>,
        username: Option<&str>,
    ) -> Result<Player> {
        let key = (chain.as_str().to_string(), wallet_address.to_string());
        let mut state = self.inner.write().await;

        if let Some(id) = state.player_ids.get(&key).copied() {
            let player = state
                .players
                .get_mut(&id)
                .ok_or_else(|| AppError::Persistence(format!("player {id} missing")))?;
            if player.email.is_none() {
                player.email = email.map(str::to_string);
            }
            if player.username.is_none() {
                player.username = username.map(str::to_string);
            }
            return Ok(player.clone());
        }

        let player = Player {
            id: Uuid::new_v4(),
            chain: key.0.clone(),
            wallet_address: key.1.clone(),
            email: email.map(str::to_string),
            username: username.map(str::to_string),
            total_points: 0,
            created_at: Utc::now(),
        };
        state.player_ids.insert(key, player.id);
        state.players.insert(player.id, player.clone());
        Ok(player)
    }

    async fn find_player(&self, wallet_address: &str) -> Result<Option<Player>> {
        let state = self.inner.read().await;
        Ok(state
            .players
            .values()
            .find(|p| p.wallet_address == wallet_address)
            .cloned())
    }

    async fn get_checkpoint(&self, slug: &str) -> Result<Option<Checkpoint>> {
        let state = self.inner.read().await;
        Ok(state.checkpoints.get(slug).cloned())
    }

    async fn get_or_create_location(&self, submission: &LocationSubmission) -> Result<Location> {
        let mut state = self.inner.write().await;
        if let Some(existing) = state.locations.get(&submission.place_id) {
            return Ok(existing.clone());
        }
        let location = Location {
            id: Uuid::new_v4(),
            place_id: submission.place_id.clone(),
            name: submission.name.clone(),
            lat: submission.lat,
            lon: submission.lon,
            kind: submission.kind.clone(),
            is_visible: true,
            points_value: submission.points_value,
            created_at: Utc::now(),
        };
        state
            .locations
            .insert(location.place_id.clone(), location.clone());
        Ok(location)
    }

    async fn record_checkpoint_checkin(
        &self,
        player_id: Uuid,
        checkpoint: &Checkpoint,
        max_per_day: i64,
    ) -> Result<CheckinOutcome> {
        let mut state = self.inner.write().await;
        let today = state.checkpoint_checkins_today(player_id);
        match policy::decide(today, max_per_day, checkpoint.points_value) {
            Decision::Deny { .. } => Err(AppError::DailyLimitReached),
            Decision::Allow { points_awarded } => state.apply_checkin(
                player_id,
                KIND_CHECKPOINT,
                checkpoint.id,
                points_awarded,
                None,
                None,
            ),
        }
    }

    async fn record_location_checkin(
        &self,
        player_id: Uuid,
        location: &Location,
        comment: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<CheckinOutcome> {
        let mut state = self.inner.write().await;
        let duplicate = state.activities.iter().any(|a| {
            a.player_id == player_id
                && a.target_kind == KIND_LOCATION
                && a.target_id == location.id
        });
        if duplicate {
            return Err(AppError::AlreadyCheckedIn);
        }
        state.apply_checkin(
            player_id,
            KIND_LOCATION,
            location.id,
            location.points_value,
            comment,
            image_url,
        )
    }

    async fn top_players(&self, limit: i64) -> Result<Vec<Player>> {
        let state = self.inner.read().await;
        let mut players: Vec<Player> = state.players.values().cloned().collect();
        players.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then(a.created_at.cmp(&b.created_at))
        });
        players.truncate(limit.max(0) as usize);
        Ok(players)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const EVM: &str = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F";

    fn seed(slug: &str, points: i64) -> SeedCheckpoint {
        SeedCheckpoint {
            slug: slug.to_string(),
            name: slug.to_string(),
            chain: "evm".to_string(),
            points_value: points,
        }
    }

    fn submission(place_id: &str) -> LocationSubmission {
        LocationSubmission {
            place_id: place_id.to_string(),
            name: "Cafe".to_string(),
            lat: 40.7,
            lon: -74.0,
            kind: None,
            points_value: 100,
        }
    }

    async fn fresh_player(ledger: &MemLedger) -> Player {
        ledger
            .get_or_create_player(ChainFamily::Evm, EVM, None, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_checkin_awards_checkpoint_value() {
        let ledger = MemLedger::new();
        let cp = ledger.seed_checkpoint(&seed("hq", 100)).await;
        let player = fresh_player(&ledger).await;

        let out = ledger
            .record_checkpoint_checkin(player.id, &cp, 10)
            .await
            .unwrap();
        assert_eq!(out.activity.points_earned, 100);
        assert_eq!(out.points_earned_today, 100);
        assert_eq!(out.player.total_points, 100);
    }

    #[tokio::test]
    async fn test_today_sum_accumulates_but_total_moves_by_delta() {
        let ledger = MemLedger::new();
        let cp = ledger.seed_checkpoint(&seed("hq", 100)).await;
        let player = fresh_player(&ledger).await;

        for _ in 0..3 {
            ledger
                .record_checkpoint_checkin(player.id, &cp, 10)
                .await
                .unwrap();
        }
        let out = ledger
            .record_checkpoint_checkin(player.id, &cp, 10)
            .await
            .unwrap();
        assert_eq!(out.points_earned_today, 400);
        assert_eq!(out.player.total_points, 400);
        assert_eq!(out.activity.points_earned, 100);
    }

    #[tokio::test]
    async fn test_daily_limit_denies_without_side_effects() {
        let ledger = MemLedger::new();
        let cp = ledger.seed_checkpoint(&seed("hq", 100)).await;
        let player = fresh_player(&ledger).await;

        for _ in 0..10 {
            ledger
                .record_checkpoint_checkin(player.id, &cp, 10)
                .await
                .unwrap();
        }
        let err = ledger
            .record_checkpoint_checkin(player.id, &cp, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DailyLimitReached));

        let state = ledger.inner.read().await;
        assert_eq!(state.activities.len(), 10);
        assert_eq!(state.players[&player.id].total_points, 1000);
    }

    #[tokio::test]
    async fn test_location_checkin_is_once_ever() {
        let ledger = MemLedger::new();
        let player = fresh_player(&ledger).await;
        let location = ledger
            .get_or_create_location(&submission("osm:1"))
            .await
            .unwrap();

        ledger
            .record_location_checkin(player.id, &location, Some("nice spot"), None)
            .await
            .unwrap();
        let err = ledger
            .record_location_checkin(player.id, &location, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyCheckedIn));

        let state = ledger.inner.read().await;
        assert_eq!(state.activities.len(), 1);
        assert_eq!(state.activities[0].comment.as_deref(), Some("nice spot"));
    }

    #[tokio::test]
    async fn test_get_or_create_location_preserves_hidden_flag() {
        let ledger = MemLedger::new();
        let hidden = Location {
            id: Uuid::new_v4(),
            place_id: "osm:2".to_string(),
            name: "Back Room".to_string(),
            lat: 0.0,
            lon: 0.0,
            kind: None,
            is_visible: false,
            points_value: 100,
            created_at: Utc::now(),
        };
        ledger.seed_location(hidden.clone()).await;

        let fetched = ledger
            .get_or_create_location(&submission("osm:2"))
            .await
            .unwrap();
        assert!(!fetched.is_visible);
        assert_eq!(fetched.id, hidden.id);
    }

    #[tokio::test]
    async fn test_player_touch_fills_email_keeps_points() {
        let ledger = MemLedger::new();
        let cp = ledger.seed_checkpoint(&seed("hq", 100)).await;
        let player = fresh_player(&ledger).await;
        ledger
            .record_checkpoint_checkin(player.id, &cp, 10)
            .await
            .unwrap();

        let touched = ledger
            .get_or_create_player(ChainFamily::Evm, EVM, Some("a@b.c"), None)
            .await
            .unwrap();
        assert_eq!(touched.id, player.id);
        assert_eq!(touched.email.as_deref(), Some("a@b.c"));
        assert_eq!(touched.total_points, 100);
    }

    #[tokio::test]
    async fn test_concurrent_checkins_lose_no_updates() {
        let ledger = Arc::new(MemLedger::new());
        let player = fresh_player(&ledger).await;

        let mut checkpoints = Vec::new();
        for i in 0..5 {
            checkpoints.push(ledger.seed_checkpoint(&seed(&format!("cp-{i}"), 100)).await);
        }

        let mut handles = Vec::new();
        for cp in checkpoints {
            let ledger = Arc::clone(&ledger);
            let player_id = player.id;
            handles.push(tokio::spawn(async move {
                ledger
                    .record_checkpoint_checkin(player_id, &cp, 10)
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let after = ledger.find_player(EVM).await.unwrap().unwrap();
        assert_eq!(after.total_points, 500);
    }
}
