//! `POST /api/checkin` — daily-limited checkpoint check-in.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::{ApiResponse, Player};
use crate::routes::AppState;
use irl_address::ChainFamily;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    /// Chain family wire name; defaults to "evm" when absent. An
    /// unknown value is rejected, never treated as the default.
    pub chain: Option<String>,
    pub wallet_address: Option<String>,
    /// Checkpoint slug.
    pub checkpoint: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinData {
    pub points_awarded: i64,
    pub points_earned_today: i64,
    pub player: Player,
}

pub async fn checkin(
    State(state): State<AppState>,
    Json(req): Json<CheckinRequest>,
) -> Result<Json<ApiResponse<CheckinData>>> {
    let chain: ChainFamily = req.chain.as_deref().unwrap_or("evm").parse()?;

    let address = required(req.wallet_address.as_deref(), "walletAddress")?;
    irl_address::validate(chain, address)?;
    let slug = required(req.checkpoint.as_deref(), "checkpoint")?;

    let checkpoint = state
        .ledger
        .get_checkpoint(slug)
        .await?
        .ok_or_else(|| AppError::Validation(format!("unknown checkpoint: {slug}")))?;
    if !checkpoint.is_active {
        return Err(AppError::CheckpointInactive);
    }
    if checkpoint.chain != chain.as_str() {
        return Err(AppError::Validation(format!(
            "checkpoint {} expects a {} wallet, got {}",
            checkpoint.slug, checkpoint.chain, chain
        )));
    }

    let player = state
        .ledger
        .get_or_create_player(chain, address, req.email.as_deref(), None)
        .await?;
    let outcome = state
        .ledger
        .record_checkpoint_checkin(player.id, &checkpoint, state.config.max_checkins_per_day)
        .await?;

    info!(
        "checkpoint check-in: player={} checkpoint={} points={} today={}",
        outcome.player.id, checkpoint.slug, outcome.activity.points_earned,
        outcome.points_earned_today
    );

    Ok(Json(ApiResponse::ok(CheckinData {
        points_awarded: outcome.activity.points_earned,
        points_earned_today: outcome.points_earned_today,
        player: outcome.player,
    })))
}

pub(crate) fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}
