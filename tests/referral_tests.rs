// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signup and referral XP allocation tests.

use brewpoints::db::firestore;
use brewpoints::error::AppError;
use brewpoints::models::User;
use brewpoints::services::referral::{
    ReferralAllocator, REFEREE_BONUS_XP, REFERRER_BONUS_XP, SIGNUP_BONUS_XP,
};
use brewpoints::time_utils::format_utc_rfc3339;

mod common;
use common::{seed_user, test_db};

async fn seed_unverified(
    db: &brewpoints::db::FirestoreDb,
    suffix: &str,
    referred_by: Option<String>,
) -> User {
    let user = User {
        id: format!("user-{}", suffix),
        phone: format!("+1556{}", suffix),
        email: format!("{}@example.com", suffix),
        name: format!("Pending User {}", suffix),
        xp: 0,
        referral_code: firestore::generate_id().unwrap(),
        referred_by,
        has_multiplier: false,
        verified: false,
        created_at: format_utc_rfc3339(chrono::Utc::now()),
    };
    db.upsert_user(&user).await.unwrap();
    user
}

#[tokio::test]
async fn test_base_signup_bonus() {
    require_emulator!();
    let db = test_db().await;
    let user = seed_unverified(&db, "ref-base", None).await;

    let allocator = ReferralAllocator::new(db.clone());
    let activated = allocator.activate_and_grant(&user).await.unwrap();

    assert!(activated.verified);
    assert_eq!(activated.xp, SIGNUP_BONUS_XP);

    let stored = db.get_user(&user.id).await.unwrap().unwrap();
    assert!(stored.verified);
    assert_eq!(stored.xp, SIGNUP_BONUS_XP);
}

#[tokio::test]
async fn test_referral_bonus_credits_both_sides() {
    require_emulator!();
    let db = test_db().await;
    let referrer = seed_user(&db, "ref-referrer").await;
    let referred = seed_unverified(
        &db,
        "ref-referred",
        Some(referrer.referral_code.clone()),
    )
    .await;

    let allocator = ReferralAllocator::new(db.clone());
    let activated = allocator.activate_and_grant(&referred).await.unwrap();

    // 100 base + 150 referral = 250
    assert_eq!(activated.xp, SIGNUP_BONUS_XP + REFEREE_BONUS_XP);

    let stored_referrer = db.get_user(&referrer.id).await.unwrap().unwrap();
    assert_eq!(stored_referrer.xp, REFERRER_BONUS_XP);
}

#[tokio::test]
async fn test_unresolvable_referral_code_grants_base_only() {
    require_emulator!();
    let db = test_db().await;
    let user = seed_unverified(&db, "ref-bogus", Some("NOSUCHCODE".to_string())).await;

    let allocator = ReferralAllocator::new(db.clone());
    let activated = allocator.activate_and_grant(&user).await.unwrap();

    assert_eq!(activated.xp, SIGNUP_BONUS_XP);
}

#[tokio::test]
async fn test_activation_fires_once() {
    require_emulator!();
    let db = test_db().await;
    let referrer = seed_user(&db, "ref-once-r").await;
    let referred = seed_unverified(
        &db,
        "ref-once",
        Some(referrer.referral_code.clone()),
    )
    .await;

    let allocator = ReferralAllocator::new(db.clone());
    allocator.activate_and_grant(&referred).await.unwrap();

    // A second activation attempt (e.g. replayed verify) must fail and
    // grant nothing further
    let err = allocator
        .activate_and_grant(&referred)
        .await
        .expect_err("Re-activation must fail");
    assert!(matches!(err, AppError::BadRequest(_)));

    let stored = db.get_user(&referred.id).await.unwrap().unwrap();
    assert_eq!(stored.xp, SIGNUP_BONUS_XP + REFEREE_BONUS_XP);
    let stored_referrer = db.get_user(&referrer.id).await.unwrap().unwrap();
    assert_eq!(stored_referrer.xp, REFERRER_BONUS_XP);
}

#[tokio::test]
async fn test_self_referral_is_ignored() {
    require_emulator!();
    let db = test_db().await;

    // User somehow submitted their own code
    let mut user = seed_unverified(&db, "ref-self", None).await;
    user.referred_by = Some(user.referral_code.clone());
    db.upsert_user(&user).await.unwrap();

    let allocator = ReferralAllocator::new(db.clone());
    let activated = allocator.activate_and_grant(&user).await.unwrap();

    assert_eq!(activated.xp, SIGNUP_BONUS_XP);
}
