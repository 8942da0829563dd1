// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward claim routes: user submission and admin adjudication.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, Role};
use crate::models::{ClaimStatus, RewardClaim};
use crate::AppState;

const MAX_CLAIM_LIST: u32 = 100;

/// Routes requiring authentication (applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/claims", post(submit_claim).get(list_claims))
        .route("/api/claims/{id}/approve", post(approve_claim))
        .route("/api/claims/{id}/reject", post(reject_claim))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ClaimResponse {
    pub id: String,
    pub user_id: String,
    pub cafe_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub amount: i64,
    pub invoice_proof: String,
    pub status: String,
    pub submitted_at: String,
    pub processed_at: Option<String>,
}

impl From<RewardClaim> for ClaimResponse {
    fn from(claim: RewardClaim) -> Self {
        Self {
            id: claim.id,
            user_id: claim.user_id,
            cafe_id: claim.cafe_id,
            amount: claim.amount,
            invoice_proof: claim.invoice_proof,
            status: match claim.status {
                ClaimStatus::Pending => "pending".to_string(),
                ClaimStatus::Approved => "approved".to_string(),
                ClaimStatus::Rejected => "rejected".to_string(),
            },
            submitted_at: claim.submitted_at,
            processed_at: claim.processed_at,
        }
    }
}

// ─── Submission ──────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct SubmitClaimRequest {
    #[validate(length(min = 1))]
    pub cafe_id: String,
    /// Claimed spend amount; the service rejects non-positive values
    pub amount: i64,
    /// Opaque URL/reference to the uploaded invoice
    #[validate(length(min = 1, max = 2048))]
    pub invoice_proof: String,
}

/// Submit a spend claim with invoice proof for admin review.
async fn submit_claim(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<SubmitClaimRequest>,
) -> Result<Json<ClaimResponse>> {
    auth.require_role(Role::User)?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let claim = state
        .claims
        .submit(
            &auth.subject_id,
            &payload.cafe_id,
            payload.amount,
            &payload.invoice_proof,
        )
        .await?;

    Ok(Json(claim.into()))
}

// ─── Adjudication ────────────────────────────────────────────

#[derive(Deserialize)]
struct ClaimsQuery {
    /// Filter by status; defaults to pending
    status: Option<String>,
}

/// List claims for adjudication (admin only).
async fn list_claims(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ClaimsQuery>,
) -> Result<Json<Vec<ClaimResponse>>> {
    auth.require_role(Role::Admin)?;

    let status = match params.status.as_deref() {
        None | Some("pending") => ClaimStatus::Pending,
        Some("approved") => ClaimStatus::Approved,
        Some("rejected") => ClaimStatus::Rejected,
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "Unknown claim status: {}",
                other
            )));
        }
    };

    let claims = state.db.list_claims_by_status(status, MAX_CLAIM_LIST).await?;

    Ok(Json(claims.into_iter().map(ClaimResponse::from).collect()))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ApproveClaimResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points_earned: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub xp_earned: u64,
}

/// Approve a pending claim, crediting the ledger (admin only).
async fn approve_claim(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(claim_id): Path<String>,
) -> Result<Json<ApproveClaimResponse>> {
    auth.require_role(Role::Admin)?;

    let outcome = state.claims.approve(&claim_id).await?;

    Ok(Json(ApproveClaimResponse {
        points_earned: outcome.points_earned,
        xp_earned: outcome.xp_earned,
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RejectClaimResponse {
    pub success: bool,
}

/// Reject a pending claim; terminal, no ledger effect (admin only).
async fn reject_claim(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(claim_id): Path<String>,
) -> Result<Json<RejectClaimResponse>> {
    auth.require_role(Role::Admin)?;

    state.claims.reject(&claim_id).await?;

    Ok(Json(RejectClaimResponse { success: true }))
}
