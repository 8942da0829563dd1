// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! BrewPoints API Server
//!
//! Cafe loyalty backend: per-cafe point balances and XP, OTP-gated point
//! redemption, and admin-approved spend claims feeding one ledger.

use brewpoints::{
    config::Config,
    db::FirestoreDb,
    services::{ClaimService, MailerService, RedemptionService, ReferralAllocator, VisitRecorder},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting BrewPoints API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Initialize the transactional mail client
    let mailer = MailerService::new(
        config.mail_api_url.clone(),
        config.mail_server_token.clone(),
        config.mail_from.clone(),
    );
    tracing::info!("Mail service initialized");

    // Business services over the shared store
    let visits = VisitRecorder::new(db.clone());
    let redemption = RedemptionService::new(db.clone(), mailer.clone());
    let claims = ClaimService::new(db.clone(), visits.clone());
    let referrals = ReferralAllocator::new(db.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        mailer,
        visits,
        redemption,
        claims,
        referrals,
    });

    // Build router
    let app = brewpoints::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("brewpoints=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
