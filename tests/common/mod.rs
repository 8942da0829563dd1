// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use brewpoints::config::Config;
use brewpoints::db::{firestore, FirestoreDb};
use brewpoints::models::{Cafe, CafeStatus, User};
use brewpoints::routes::create_router;
use brewpoints::services::{
    ClaimService, MailerService, RedemptionService, ReferralAllocator, VisitRecorder,
};
use brewpoints::time_utils::format_utc_rfc3339;
use brewpoints::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db_offline();
    let mailer = MailerService::new_mock();

    let visits = VisitRecorder::new(db.clone());
    let redemption = RedemptionService::new(db.clone(), mailer.clone());
    let claims = ClaimService::new(db.clone(), visits.clone());
    let referrals = ReferralAllocator::new(db.clone());

    let state = Arc::new(AppState {
        config,
        db,
        mailer,
        visits,
        redemption,
        claims,
        referrals,
    });

    (create_router(state.clone()), state)
}

/// Seed a verified user with a unique suffix.
#[allow(dead_code)]
pub async fn seed_user(db: &FirestoreDb, suffix: &str) -> User {
    let user = User {
        id: format!("user-{}", suffix),
        phone: format!("+1555{}", suffix),
        email: format!("{}@example.com", suffix),
        name: format!("Test User {}", suffix),
        xp: 0,
        referral_code: firestore::generate_id().expect("id generation"),
        referred_by: None,
        has_multiplier: false,
        verified: true,
        created_at: format_utc_rfc3339(chrono::Utc::now()),
    };
    db.upsert_user(&user).await.expect("Failed to seed user");
    user
}

/// Seed an active cafe with a unique suffix.
#[allow(dead_code)]
pub async fn seed_cafe(db: &FirestoreDb, suffix: &str) -> Cafe {
    let cafe = Cafe {
        id: format!("cafe-{}", suffix),
        name: format!("Test Cafe {}", suffix),
        email: format!("cafe-{}@example.com", suffix),
        status: CafeStatus::Active,
        created_at: format_utc_rfc3339(chrono::Utc::now()),
    };
    db.upsert_cafe(&cafe).await.expect("Failed to seed cafe");
    cafe
}
