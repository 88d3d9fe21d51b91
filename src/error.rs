use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::inventory::StoreError;
use crate::reservation::ReservationError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
    #[error(transparent)]
    Reservation(#[from] ReservationError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::Reservation(err) => {
                let status = match &err {
                    ReservationError::Invalid(_) => StatusCode::BAD_REQUEST,
                    ReservationError::NotFound { .. } => StatusCode::NOT_FOUND,
                    ReservationError::Busy
                    | ReservationError::InsufficientInventory { .. }
                    | ReservationError::DuplicateReference(_) => StatusCode::CONFLICT,
                    ReservationError::Persistence(_) | ReservationError::Unknown(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };

                let mut body = json!({
                    "error": err.to_string(),
                    "reason": err.reason(),
                });
                if let Some(remaining) = err.remaining_seats() {
                    body["remaining_seats"] = json!(remaining);
                }
                (status, body)
            }
        };

        (status, Json(body)).into_response()
    }
}
