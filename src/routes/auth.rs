// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration and account-challenge routes.
//!
//! Registration is a two-step flow: submit details (a code is emailed),
//! then verify the code. Signup and referral XP are granted at
//! verification, atomically with the account's activation.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::firestore;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, create_reset_jwt, Role};
use crate::models::{ChallengePurpose, User};
use crate::services::referral::generate_referral_code;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify", post(verify))
        .route("/auth/password-reset/request", post(password_reset_request))
        .route("/auth/password-reset/confirm", post(password_reset_confirm))
}

// ─── Registration ────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 7, max = 20))]
    pub phone: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Another user's referral code, optional
    pub referral_code: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RegisterResponse {
    /// Where the verification code was sent
    pub email: String,
}

/// Start registration: store the unverified user and email a code.
///
/// Re-registering an unverified account reissues the code (the prior
/// code stops working). A verified phone or email cannot register again.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = match state.db.find_user_by_phone(&payload.phone).await? {
        Some(existing) if existing.verified => {
            return Err(AppError::BadRequest(
                "Phone number is already registered".to_string(),
            ));
        }
        Some(existing) => existing,
        None => match state.db.find_user_by_email(&payload.email).await? {
            Some(by_email) if by_email.verified => {
                return Err(AppError::BadRequest(
                    "Email is already registered".to_string(),
                ));
            }
            // A stalled registration under this email: reuse it rather
            // than piling up duplicates
            Some(by_email) => by_email,
            None => {
                let user = User {
                    id: firestore::generate_id()?,
                    phone: payload.phone.clone(),
                    email: payload.email.clone(),
                    name: payload.name.clone(),
                    xp: 0,
                    referral_code: generate_referral_code()?,
                    referred_by: payload.referral_code.clone(),
                    has_multiplier: false,
                    verified: false,
                    created_at: format_utc_rfc3339(chrono::Utc::now()),
                };
                state.db.upsert_user(&user).await?;
                user
            }
        },
    };

    let purpose = ChallengePurpose::Registration;
    let ttl = purpose.ttl();
    let challenge = state.db.issue_challenge(&user.email, purpose, ttl).await?;

    if let Err(e) = state
        .mailer
        .send_verification_code(&user.email, "registration", &challenge.code)
        .await
    {
        // No dangling challenge without a delivered code
        state
            .db
            .delete_challenge(&user.email, challenge.purpose.storage_key())
            .await?;
        return Err(e);
    }

    tracing::info!(user_id = %user.id, "Registration started, code sent");

    Ok(Json(RegisterResponse { email: user.email }))
}

// ─── Verification ────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct VerifyRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub code: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VerifyResponse {
    pub token: String,
    pub user_id: String,
    pub name: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub xp: u64,
}

/// Complete registration: consume the challenge, activate the account,
/// grant signup/referral XP, and issue a session token.
async fn verify(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let purpose = state
        .db
        .consume_challenge(&payload.email, "registration", &payload.code)
        .await?;

    if purpose != ChallengePurpose::Registration {
        return Err(AppError::InvalidOrExpiredChallenge);
    }

    let user = state
        .db
        .find_user_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", payload.email)))?;

    let activated = state.referrals.activate_and_grant(&user).await?;

    let token = create_jwt(&activated.id, Role::User, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    Ok(Json(VerifyResponse {
        token,
        user_id: activated.id,
        name: activated.name,
        xp: activated.xp,
    }))
}

// ─── Password Reset ──────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PasswordResetRequestResponse {
    pub success: bool,
}

/// Issue a password-reset code.
///
/// Unknown emails report success without issuing anything, so the
/// endpoint cannot be used to probe for accounts.
async fn password_reset_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<PasswordResetRequestResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if let Some(user) = state.db.find_user_by_email(&payload.email).await? {
        let purpose = ChallengePurpose::PasswordReset;
        let ttl = purpose.ttl();
        let challenge = state.db.issue_challenge(&user.email, purpose, ttl).await?;

        if let Err(e) = state
            .mailer
            .send_verification_code(&user.email, "password reset", &challenge.code)
            .await
        {
            state
                .db
                .delete_challenge(&user.email, challenge.purpose.storage_key())
                .await?;
            return Err(e);
        }
    } else {
        tracing::debug!("Password reset requested for unknown email");
    }

    Ok(Json(PasswordResetRequestResponse { success: true }))
}

#[derive(Deserialize, Validate)]
pub struct PasswordResetConfirm {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub code: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PasswordResetConfirmResponse {
    /// Short-lived token the credential service accepts for the actual
    /// password change
    pub reset_token: String,
}

/// Confirm a password-reset code and hand back a short-lived reset token.
async fn password_reset_confirm(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetConfirm>,
) -> Result<Json<PasswordResetConfirmResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let purpose = state
        .db
        .consume_challenge(&payload.email, "password_reset", &payload.code)
        .await?;

    if purpose != ChallengePurpose::PasswordReset {
        return Err(AppError::InvalidOrExpiredChallenge);
    }

    let user = state
        .db
        .find_user_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", payload.email)))?;

    let reset_token = create_reset_jwt(&user.id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    Ok(Json(PasswordResetConfirmResponse { reset_token }))
}
