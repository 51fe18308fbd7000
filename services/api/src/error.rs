//! Service-wide error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use irl_address::AddressError;
use tracing::error;

use crate::models::ApiResponse;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("daily check-in limit reached")]
    DailyLimitReached,

    #[error("already checked in at this location")]
    AlreadyCheckedIn,

    #[error("location is not visible")]
    LocationHidden,

    #[error("checkpoint is not active")]
    CheckpointInactive,

    #[error("player not found")]
    PlayerNotFound,

    /// Internal detail, logged server-side and never sent to the client.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::UnsupportedChain(_) => StatusCode::BAD_REQUEST,
            AppError::DailyLimitReached => StatusCode::TOO_MANY_REQUESTS,
            AppError::AlreadyCheckedIn => StatusCode::CONFLICT,
            AppError::LocationHidden | AppError::CheckpointInactive => StatusCode::FORBIDDEN,
            AppError::PlayerNotFound => StatusCode::NOT_FOUND,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AddressError> for AppError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::UnsupportedChain(chain) => AppError::UnsupportedChain(chain),
            AddressError::Malformed { chain } => {
                AppError::Validation(format!("invalid {chain} address format"))
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        // Unique-violation on the (player, location) index means a replayed
        // location check-in, which is a client error, not a server fault.
        if let sqlx::Error::Database(ref db) = err {
            if db.code().as_deref() == Some("23505") {
                return AppError::AlreadyCheckedIn;
            }
        }
        AppError::Persistence(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Persistence(detail) => {
                error!("check-in persistence failure: {detail}");
                "failed to process check-in".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ApiResponse::<()>::err(message))).into_response()
    }
}
