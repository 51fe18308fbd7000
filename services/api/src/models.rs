//! Domain models shared by the routes and both ledger backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ── Player ──────────────────────────────────────────────────────

/// A rewards-program participant, keyed by one wallet address on one
/// chain family. `total_points` only ever grows, and only through the
/// ledger's check-in path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Player {
    pub id: Uuid,
    /// Wire name of the chain family ("evm", "solana", ...).
    pub chain: String,
    pub wallet_address: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub total_points: i64,
    pub created_at: DateTime<Utc>,
}

// ── Check-in targets ────────────────────────────────────────────

/// An admin-defined, chain-typed check-in target with a fixed point
/// value. Subject to the per-day check-in limit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Checkpoint {
    pub id: Uuid,
    /// Stable identifier used in check-in requests.
    pub slug: String,
    pub name: String,
    pub chain: String,
    pub points_value: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A geographic check-in target. Each wallet may check in at a given
/// location at most once ever.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: Uuid,
    /// Upstream geocoder place identifier; unique per location.
    pub place_id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub kind: Option<String>,
    pub is_visible: bool,
    pub points_value: i64,
    pub created_at: DateTime<Utc>,
}

/// `target_kind` value for checkpoint-path activity rows.
pub const KIND_CHECKPOINT: &str = "checkpoint";
/// `target_kind` value for location-path activity rows.
pub const KIND_LOCATION: &str = "location";

// ── Activity ────────────────────────────────────────────────────

/// Immutable record of one accepted check-in. Same-day rows for a
/// player are the basis for the daily limit and the today-sum.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CheckinActivity {
    pub id: Uuid,
    pub player_id: Uuid,
    /// `"checkpoint"` or `"location"`.
    pub target_kind: String,
    pub target_id: Uuid,
    pub points_earned: i64,
    pub comment: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ── Inbound shapes ──────────────────────────────────────────────

/// Validated location payload handed to the ledger; produced by the
/// location-checkin route after geo/shape validation.
#[derive(Debug, Clone)]
pub struct LocationSubmission {
    pub place_id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub kind: Option<String>,
    pub points_value: i64,
}

// ── Response envelope ───────────────────────────────────────────

/// The single response envelope every endpoint produces. `data` is
/// present exactly when `success` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
