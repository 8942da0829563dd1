// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Redemption protocol routes.
//!
//! Initiate requires a cafe session; verify is public because the
//! consumed challenge itself is the authority, and the code only reaches
//! the customer whose points are being redeemed.

use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, Role};
use crate::AppState;

/// Routes requiring a cafe session (auth middleware applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/redemption/initiate", post(initiate))
}

/// Public routes (phase 2 of the protocol).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/redemption/verify", post(verify))
}

// ─── Initiate ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct InitiateRequest {
    #[validate(length(min = 7, max = 20))]
    pub customer_phone: String,
    /// Points to redeem; the service rejects non-positive amounts
    pub points: i64,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct InitiateResponse {
    /// Where the code was sent; pass back to the verify endpoint
    pub customer_email: String,
}

/// Phase 1: balance check, challenge issuance, customer notification.
async fn initiate(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<InitiateRequest>,
) -> Result<Json<InitiateResponse>> {
    auth.require_role(Role::Cafe)?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let outcome = state
        .redemption
        .initiate(&auth.subject_id, &payload.customer_phone, payload.points)
        .await?;

    Ok(Json(InitiateResponse {
        customer_email: outcome.customer_email,
    }))
}

// ─── Verify ──────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RedeemVerifyRequest {
    #[validate(email)]
    pub customer_email: String,
    #[validate(length(equal = 6))]
    pub code: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RedeemVerifyResponse {
    pub success: bool,
}

/// Phase 2: consume the challenge and debit the ledger.
async fn verify(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RedeemVerifyRequest>,
) -> Result<Json<RedeemVerifyResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state
        .redemption
        .verify(&payload.customer_email, &payload.code)
        .await?;

    Ok(Json(RedeemVerifyResponse { success: true }))
}
