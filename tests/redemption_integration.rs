// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end redemption protocol tests.

use brewpoints::db::firestore;
use brewpoints::error::AppError;
use brewpoints::models::{RewardTransaction, TransactionKind};
use brewpoints::services::{MailerService, RedemptionService, VisitRecorder};
use brewpoints::time_utils::format_utc_rfc3339_micros;

mod common;
use common::{seed_cafe, seed_user, test_db};

#[tokio::test]
async fn test_redemption_round_trip() {
    require_emulator!();
    let db = test_db().await;
    let user = seed_user(&db, "redeem-rt").await;
    let cafe = seed_cafe(&db, "redeem-rt").await;

    // 500 points at the cafe
    let recorder = VisitRecorder::new(db.clone());
    recorder
        .record_visit(&user.id, &cafe.id, 5000, false)
        .await
        .unwrap();

    let service = RedemptionService::new(db.clone(), MailerService::new_mock());
    let outcome = service
        .initiate(&cafe.id, &user.phone, 200)
        .await
        .expect("Initiate should succeed");
    assert_eq!(outcome.customer_email, user.email);

    // The customer reads the code from their email; the test reads it
    // from the store.
    let challenge = db
        .get_challenge(&user.email, "redemption")
        .await
        .unwrap()
        .expect("Challenge must be live after initiate");

    service
        .verify(&user.email, &challenge.code)
        .await
        .expect("Verify should succeed");

    assert_eq!(db.get_balance(&user.id, &cafe.id).await.unwrap(), 300);

    let transactions = db
        .get_transactions_for_pair(&user.id, &cafe.id, None, 100)
        .await
        .unwrap();
    let redeems: Vec<_> = transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Redeem)
        .collect();
    assert_eq!(redeems.len(), 1);
    assert_eq!(redeems[0].points, -200);
}

#[tokio::test]
async fn test_initiate_rejects_non_positive_amount() {
    require_emulator!();
    let db = test_db().await;
    let user = seed_user(&db, "redeem-zero").await;
    let cafe = seed_cafe(&db, "redeem-zero").await;

    let service = RedemptionService::new(db.clone(), MailerService::new_mock());

    let err = service
        .initiate(&cafe.id, &user.phone, 0)
        .await
        .expect_err("Zero points must be rejected");
    assert!(matches!(err, AppError::InvalidAmount));

    let err = service
        .initiate(&cafe.id, &user.phone, -5)
        .await
        .expect_err("Negative points must be rejected");
    assert!(matches!(err, AppError::InvalidAmount));
}

#[tokio::test]
async fn test_initiate_rejects_unknown_customer() {
    require_emulator!();
    let db = test_db().await;
    let cafe = seed_cafe(&db, "redeem-nocust").await;

    let service = RedemptionService::new(db.clone(), MailerService::new_mock());
    let err = service
        .initiate(&cafe.id, "+15550000000", 10)
        .await
        .expect_err("Unknown customer must be rejected");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_initiate_insufficient_balance_reports_both_amounts() {
    require_emulator!();
    let db = test_db().await;
    let user = seed_user(&db, "redeem-short").await;
    let cafe = seed_cafe(&db, "redeem-short").await;

    let recorder = VisitRecorder::new(db.clone());
    recorder
        .record_visit(&user.id, &cafe.id, 1000, false)
        .await
        .unwrap();

    let service = RedemptionService::new(db.clone(), MailerService::new_mock());
    let err = service
        .initiate(&cafe.id, &user.phone, 200)
        .await
        .expect_err("Requesting 200 of 100 must fail");

    match &err {
        AppError::InsufficientBalance {
            requested,
            available,
        } => {
            assert_eq!(*requested, 200);
            assert_eq!(*available, 100);
        }
        other => panic!("Expected InsufficientBalance, got {:?}", other),
    }

    // The user-facing message carries both amounts
    let message = err.to_string();
    assert!(message.contains("200"));
    assert!(message.contains("100"));

    // No challenge was issued
    assert!(db
        .get_challenge(&user.email, "redemption")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_verify_fails_when_balance_shrank() {
    require_emulator!();
    let db = test_db().await;
    let user = seed_user(&db, "redeem-race").await;
    let cafe = seed_cafe(&db, "redeem-race").await;

    let recorder = VisitRecorder::new(db.clone());
    recorder
        .record_visit(&user.id, &cafe.id, 1000, false)
        .await
        .unwrap();

    let service = RedemptionService::new(db.clone(), MailerService::new_mock());
    service
        .initiate(&cafe.id, &user.phone, 80)
        .await
        .expect("Initiate against 100 points should succeed");

    // Another process debits 50 points between initiate and verify
    let out_of_band = RewardTransaction {
        id: firestore::generate_id().unwrap(),
        user_id: user.id.clone(),
        cafe_id: cafe.id.clone(),
        kind: TransactionKind::Redeem,
        points: -50,
        description: "Redeemed 50 points".to_string(),
        created_at: format_utc_rfc3339_micros(chrono::Utc::now()),
    };
    db.redeem_points_atomic(&user.id, &cafe.id, 50, &out_of_band)
        .await
        .unwrap();

    let challenge = db
        .get_challenge(&user.email, "redemption")
        .await
        .unwrap()
        .expect("Challenge still live");

    let err = service
        .verify(&user.email, &challenge.code)
        .await
        .expect_err("Verify must fail against the shrunken balance");
    assert!(matches!(err, AppError::InsufficientBalance { .. }));

    // The failed verify leaves the balance untouched
    assert_eq!(db.get_balance(&user.id, &cafe.id).await.unwrap(), 50);

    // The challenge was consumed; retrying is not possible
    let err = service
        .verify(&user.email, &challenge.code)
        .await
        .expect_err("Consumed challenge must not be reusable");
    assert!(matches!(err, AppError::InvalidOrExpiredChallenge));
}

#[tokio::test]
async fn test_notification_failure_retracts_challenge() {
    require_emulator!();
    let db = test_db().await;
    let user = seed_user(&db, "redeem-mailfail").await;
    let cafe = seed_cafe(&db, "redeem-mailfail").await;

    let recorder = VisitRecorder::new(db.clone());
    recorder
        .record_visit(&user.id, &cafe.id, 1000, false)
        .await
        .unwrap();

    let service = RedemptionService::new(db.clone(), MailerService::new_mock_failing());
    let err = service
        .initiate(&cafe.id, &user.phone, 50)
        .await
        .expect_err("Initiate must fail when the code cannot be delivered");
    assert!(matches!(err, AppError::NotificationFailed(_)));

    // No dangling live challenge without a delivered code
    assert!(db
        .get_challenge(&user.email, "redemption")
        .await
        .unwrap()
        .is_none());

    // And no ledger effect
    assert_eq!(db.get_balance(&user.id, &cafe.id).await.unwrap(), 100);
}

#[tokio::test]
async fn test_unverified_challenge_expires_as_noop() {
    require_emulator!();
    let db = test_db().await;
    let user = seed_user(&db, "redeem-noop").await;
    let cafe = seed_cafe(&db, "redeem-noop").await;

    let recorder = VisitRecorder::new(db.clone());
    recorder
        .record_visit(&user.id, &cafe.id, 1000, false)
        .await
        .unwrap();

    let service = RedemptionService::new(db.clone(), MailerService::new_mock());
    service.initiate(&cafe.id, &user.phone, 80).await.unwrap();

    // Initiate mutates no ledger state; an abandoned challenge needs no
    // compensating action.
    assert_eq!(db.get_balance(&user.id, &cafe.id).await.unwrap(), 100);
    let transactions = db
        .get_transactions_for_pair(&user.id, &cafe.id, None, 100)
        .await
        .unwrap();
    assert_eq!(transactions.len(), 1, "Only the earn transaction exists");
}
