// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maintenance routes, invoked by an admin or a scheduler.

use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::middleware::auth::{AuthUser, Role};
use crate::AppState;

/// Routes requiring authentication (applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/maintenance/purge-challenges", post(purge_challenges))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PurgeResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub purged: usize,
}

/// Delete challenges past their expiry (admin only).
///
/// Consume already treats expired challenges as absent; this reclaims
/// the storage.
async fn purge_challenges(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<PurgeResponse>> {
    auth.require_role(Role::Admin)?;

    let purged = state.db.purge_expired_challenges().await?;

    Ok(Json(PurgeResponse { purged }))
}
