// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visit recording and customer/ledger read routes.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, Role};
use crate::models::{RewardTransaction, TransactionKind};
use crate::AppState;

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;

/// Routes requiring authentication (applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/visits", post(record_visit))
        .route("/api/customers/{phone}", get(customer_snapshot))
        .route(
            "/api/customers/{phone}/transactions",
            get(customer_transactions),
        )
        .route("/api/me", get(get_me))
}

// ─── Visit Recording ─────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RecordVisitRequest {
    #[validate(length(min = 7, max = 20))]
    pub customer_phone: String,
    /// Spend amount in currency units
    pub amount_spent: i64,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VisitResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points_earned: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub xp_earned: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub new_balance: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub new_xp: u64,
}

/// Record a visit for a customer at the calling cafe.
async fn record_visit(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<RecordVisitRequest>,
) -> Result<Json<VisitResponse>> {
    auth.require_role(Role::Cafe)?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let customer = state
        .db
        .find_user_by_phone(&payload.customer_phone)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Customer with phone {} not found",
                payload.customer_phone
            ))
        })?;

    let outcome = state
        .visits
        .record_visit(&customer.id, &auth.subject_id, payload.amount_spent, false)
        .await?;

    Ok(Json(VisitResponse {
        points_earned: outcome.points_earned,
        xp_earned: outcome.xp_earned,
        new_balance: outcome.new_balance,
        new_xp: outcome.new_xp,
    }))
}

// ─── Customer Snapshot ───────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CustomerSnapshotResponse {
    pub name: String,
    /// Balance at the calling cafe
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub balance: i64,
}

/// Look up a customer by phone and their balance at the calling cafe.
async fn customer_snapshot(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(phone): Path<String>,
) -> Result<Json<CustomerSnapshotResponse>> {
    auth.require_role(Role::Cafe)?;

    let customer = state
        .db
        .find_user_by_phone(&phone)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer with phone {} not found", phone)))?;

    let balance = state.db.get_balance(&customer.id, &auth.subject_id).await?;

    Ok(Json(CustomerSnapshotResponse {
        name: customer.name,
        balance,
    }))
}

// ─── Transaction Feed ────────────────────────────────────────

#[derive(Deserialize)]
struct TransactionsQuery {
    /// Cursor for forward pagination (opaque token)
    cursor: Option<String>,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TransactionEntry {
    pub id: String,
    pub kind: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points: i64,
    pub description: String,
    pub created_at: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TransactionsResponse {
    pub transactions: Vec<TransactionEntry>,
    /// Pass back as `cursor` to fetch the next page; absent on the last page
    pub next_cursor: Option<String>,
}

/// Transaction feed for a customer at the calling cafe, newest first.
async fn customer_transactions(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(phone): Path<String>,
    Query(params): Query<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>> {
    auth.require_role(Role::Cafe)?;

    let limit = params.per_page.min(MAX_PER_PAGE).max(1);
    let before = parse_cursor(params.cursor.as_deref())?;

    let customer = state
        .db
        .find_user_by_phone(&phone)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer with phone {} not found", phone)))?;

    let results = state
        .db
        .get_transactions_for_pair(&customer.id, &auth.subject_id, before, limit)
        .await?;

    let next_cursor = if results.len() as u32 == limit {
        results.last().map(|t| encode_cursor(&t.created_at))
    } else {
        None
    };

    let transactions = results.into_iter().map(to_entry).collect();

    Ok(Json(TransactionsResponse {
        transactions,
        next_cursor,
    }))
}

fn to_entry(txn: RewardTransaction) -> TransactionEntry {
    TransactionEntry {
        id: txn.id,
        kind: match txn.kind {
            TransactionKind::Earn => "earn".to_string(),
            TransactionKind::Redeem => "redeem".to_string(),
        },
        points: txn.points,
        description: txn.description,
        created_at: txn.created_at,
    }
}

fn parse_cursor(cursor: Option<&str>) -> Result<Option<String>> {
    cursor
        .map(|raw| {
            let invalid_cursor =
                || AppError::BadRequest("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;

            // Must be a timestamp we produced
            chrono::DateTime::parse_from_rfc3339(decoded_str).map_err(|_| invalid_cursor())?;

            Ok(decoded_str.to_string())
        })
        .transpose()
}

fn encode_cursor(created_at: &str) -> String {
    URL_SAFE_NO_PAD.encode(created_at.as_bytes())
}

// ─── User Profile ────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BalanceEntry {
    pub cafe_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_points: i64,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeResponse {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub xp: u64,
    pub referral_code: String,
    pub balances: Vec<BalanceEntry>,
}

/// Current user profile with XP and all per-cafe balances.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    auth.require_role(Role::User)?;

    let user = state
        .db
        .get_user(&auth.subject_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.subject_id)))?;

    let balances = state
        .db
        .get_balances_for_user(&user.id)
        .await?
        .into_iter()
        .map(|b| BalanceEntry {
            cafe_id: b.cafe_id,
            total_points: b.total_points,
        })
        .collect();

    Ok(Json(MeResponse {
        user_id: user.id,
        name: user.name,
        email: user.email,
        phone: user.phone,
        xp: user.xp,
        referral_code: user.referral_code,
        balances,
    }))
}
