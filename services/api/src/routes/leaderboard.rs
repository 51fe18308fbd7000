//! `GET /api/leaderboard` — top players by all-time points.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{ApiResponse, Player};
use crate::routes::AppState;

/// Hard cap on requested leaderboard size.
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardData {
    pub players: Vec<Player>,
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<ApiResponse<LeaderboardData>>> {
    let limit = query
        .limit
        .unwrap_or(state.config.leaderboard_limit)
        .clamp(1, MAX_LIMIT);
    let players = state.ledger.top_players(limit).await?;
    Ok(Json(ApiResponse::ok(LeaderboardData { players })))
}
