//! `POST /api/location-checkin` and the player lookup on the same path.
//!
//! The location payload is validated in full before any player or
//! location lookup happens; a bad latitude never touches the ledger.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::{ApiResponse, CheckinActivity, Location, LocationSubmission, Player};
use crate::routes::checkin::required;
use crate::routes::AppState;
use irl_address::ChainFamily;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCheckinRequest {
    pub wallet_address: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub location_data: Option<LocationData>,
    pub comment: Option<String>,
    pub image_url: Option<String>,
}

/// Raw geocoder payload; field names follow the upstream shape.
#[derive(Debug, Deserialize)]
pub struct LocationData {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCheckinData {
    pub checkin: CheckinActivity,
    pub player: Player,
    pub location: Location,
    pub points_earned: i64,
    pub message: String,
}

pub async fn location_checkin(
    State(state): State<AppState>,
    Json(req): Json<LocationCheckinRequest>,
) -> Result<Json<ApiResponse<LocationCheckinData>>> {
    let address = required(req.wallet_address.as_deref(), "walletAddress")?;
    // No chain field on this path; the address format identifies the
    // family unambiguously.
    let chain = ChainFamily::detect(address)
        .ok_or_else(|| AppError::Validation("unrecognized wallet address format".to_string()))?;

    let submission = validate_location_data(req.location_data.as_ref(), &state)?;

    let player = state
        .ledger
        .get_or_create_player(chain, address, req.email.as_deref(), req.username.as_deref())
        .await?;
    let location = state.ledger.get_or_create_location(&submission).await?;
    if !location.is_visible {
        return Err(AppError::LocationHidden);
    }

    let outcome = state
        .ledger
        .record_location_checkin(
            player.id,
            &location,
            req.comment.as_deref(),
            req.image_url.as_deref(),
        )
        .await?;

    info!(
        "location check-in: player={} location={} points={}",
        outcome.player.id, location.place_id, outcome.activity.points_earned
    );

    let message = format!("Checked in at {}", location.name);
    let points_earned = outcome.activity.points_earned;
    Ok(Json(ApiResponse::ok(LocationCheckinData {
        checkin: outcome.activity,
        player: outcome.player,
        location,
        points_earned,
        message,
    })))
}

fn validate_location_data(
    data: Option<&LocationData>,
    state: &AppState,
) -> Result<LocationSubmission> {
    let data = data.ok_or_else(|| AppError::Validation("locationData is required".to_string()))?;

    let place_id = required(data.place_id.as_deref(), "locationData.place_id")?;
    let name = data
        .name
        .as_deref()
        .or(data.display_name.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AppError::Validation("locationData.name or display_name is required".to_string())
        })?;

    let lat = data
        .lat
        .ok_or_else(|| AppError::Validation("locationData.lat is required".to_string()))?;
    let lon = data
        .lon
        .ok_or_else(|| AppError::Validation("locationData.lon is required".to_string()))?;
    // NaN fails both range checks.
    if !(-90.0..=90.0).contains(&lat) {
        return Err(AppError::Validation(format!(
            "lat out of range [-90, 90]: {lat}"
        )));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(AppError::Validation(format!(
            "lon out of range [-180, 180]: {lon}"
        )));
    }

    Ok(LocationSubmission {
        place_id: place_id.to_string(),
        name: name.to_string(),
        lat,
        lon,
        kind: data.kind.clone(),
        points_value: state.config.location_points_value,
    })
}

// ── GET /api/location-checkin ───────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerQuery {
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlayerData {
    pub player: Player,
}

pub async fn find_player(
    State(state): State<AppState>,
    Query(query): Query<PlayerQuery>,
) -> Result<Json<ApiResponse<PlayerData>>> {
    let address = required(query.wallet_address.as_deref(), "walletAddress")?;
    let player = state
        .ledger
        .find_player(address)
        .await?
        .ok_or(AppError::PlayerNotFound)?;
    Ok(Json(ApiResponse::ok(PlayerData { player })))
}
