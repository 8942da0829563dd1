// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Redemption amount must be a positive number of points")]
    InvalidAmount,

    /// Carries both sides so the cafe operator can correct course
    /// without a second round trip.
    #[error("Insufficient balance: requested {requested} points, available {available}")]
    InsufficientBalance { requested: i64, available: i64 },

    /// Wrong code, expired code, and already-consumed code are deliberately
    /// indistinguishable to the caller.
    #[error("Invalid or expired verification code")]
    InvalidOrExpiredChallenge,

    #[error("Claim has already been processed")]
    AlreadyProcessed,

    #[error("Failed to deliver notification: {0}")]
    NotificationFailed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::InvalidAmount => (
                StatusCode::BAD_REQUEST,
                "invalid_amount",
                Some(self.to_string()),
            ),
            AppError::InsufficientBalance { .. } => (
                StatusCode::CONFLICT,
                "insufficient_balance",
                Some(self.to_string()),
            ),
            AppError::InvalidOrExpiredChallenge => (
                StatusCode::BAD_REQUEST,
                "invalid_or_expired_code",
                Some(self.to_string()),
            ),
            AppError::AlreadyProcessed => (
                StatusCode::CONFLICT,
                "already_processed",
                Some(self.to_string()),
            ),
            AppError::NotificationFailed(msg) => {
                tracing::warn!(error = %msg, "Notification delivery failed");
                (StatusCode::BAD_GATEWAY, "notification_failed", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
