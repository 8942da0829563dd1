// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use brewpoints::error::AppError;

#[test]
fn test_insufficient_balance_message_carries_both_amounts() {
    let err = AppError::InsufficientBalance {
        requested: 200,
        available: 150,
    };
    let message = err.to_string();
    assert!(message.contains("200"));
    assert!(message.contains("150"));
}

#[tokio::test]
async fn test_status_code_mapping() {
    let cases = [
        (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
        (AppError::InvalidToken, StatusCode::UNAUTHORIZED),
        (
            AppError::NotFound("User u1 not found".to_string()),
            StatusCode::NOT_FOUND,
        ),
        (
            AppError::BadRequest("bad".to_string()),
            StatusCode::BAD_REQUEST,
        ),
        (AppError::InvalidAmount, StatusCode::BAD_REQUEST),
        (
            AppError::InsufficientBalance {
                requested: 10,
                available: 5,
            },
            StatusCode::CONFLICT,
        ),
        (
            AppError::InvalidOrExpiredChallenge,
            StatusCode::BAD_REQUEST,
        ),
        (AppError::AlreadyProcessed, StatusCode::CONFLICT),
        (
            AppError::NotificationFailed("smtp down".to_string()),
            StatusCode::BAD_GATEWAY,
        ),
        (
            AppError::Database("offline".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (err, expected) in cases {
        let response = err.into_response();
        assert_eq!(response.status(), expected);
    }
}

#[test]
fn test_challenge_failures_are_indistinguishable() {
    // Absent, expired, and mismatched codes all surface as the same
    // error; the message must not hint at which codes ever existed.
    let err = AppError::InvalidOrExpiredChallenge;
    assert_eq!(err.to_string(), "Invalid or expired verification code");
}
