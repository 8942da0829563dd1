// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Two-phase point redemption, run by a cafe against a customer.
//!
//! Phase 1 (initiate) checks the balance optimistically, issues a
//! single-use challenge to the customer's email, and delivers the code.
//! Phase 2 (verify) consumes the challenge and debits the ledger
//! authoritatively. The double balance check tolerates the time gap a
//! human OTP exchange requires while still preventing over-redemption
//! from a stale approval.

use crate::db::FirestoreDb;
use crate::db::firestore;
use crate::error::{AppError, Result};
use crate::models::{ChallengePurpose, RewardTransaction, TransactionKind};
use crate::services::MailerService;
use crate::time_utils::format_utc_rfc3339_micros;

/// Result of a successful initiate: the email the code was sent to, so
/// the caller can correlate phase 2.
#[derive(Debug)]
pub struct InitiateOutcome {
    pub customer_email: String,
}

/// Runs the redemption protocol.
#[derive(Clone)]
pub struct RedemptionService {
    db: FirestoreDb,
    mailer: MailerService,
}

impl RedemptionService {
    pub fn new(db: FirestoreDb, mailer: MailerService) -> Self {
        Self { db, mailer }
    }

    /// Phase 1: check balance, issue a challenge, notify the customer.
    ///
    /// No ledger state is mutated here; a challenge that is never
    /// verified simply expires.
    pub async fn initiate(
        &self,
        cafe_id: &str,
        customer_phone: &str,
        points: i64,
    ) -> Result<InitiateOutcome> {
        if points <= 0 {
            return Err(AppError::InvalidAmount);
        }

        let cafe = self
            .db
            .get_cafe(cafe_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Cafe {} not found", cafe_id)))?;

        if !cafe.is_active() {
            return Err(AppError::BadRequest(format!(
                "Cafe {} is not active",
                cafe_id
            )));
        }

        let customer = self
            .db
            .find_user_by_phone(customer_phone)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Customer with phone {} not found", customer_phone))
            })?;

        let available = self.db.get_balance(&customer.id, &cafe.id).await?;
        if points > available {
            return Err(AppError::InsufficientBalance {
                requested: points,
                available,
            });
        }

        let purpose = ChallengePurpose::Redemption {
            cafe_id: cafe.id.clone(),
            user_id: customer.id.clone(),
            points,
        };
        let ttl = purpose.ttl();
        let challenge = self
            .db
            .issue_challenge(&customer.email, purpose, ttl)
            .await?;

        // A live challenge whose code was never delivered is a dead end
        // for the customer; retract it before reporting the failure.
        if let Err(e) = self
            .mailer
            .send_verification_code(&customer.email, "point redemption", &challenge.code)
            .await
        {
            self.db
                .delete_challenge(&customer.email, challenge.purpose.storage_key())
                .await?;
            return Err(e);
        }

        tracing::info!(
            cafe_id = %cafe.id,
            user_id = %customer.id,
            points,
            "Redemption initiated, code sent"
        );

        Ok(InitiateOutcome {
            customer_email: customer.email,
        })
    }

    /// Phase 2: consume the challenge and debit the ledger.
    ///
    /// The challenge is consumed even if the debit then fails (the
    /// balance may have changed since initiate); the caller must
    /// re-initiate in that case.
    pub async fn verify(&self, customer_email: &str, code: &str) -> Result<()> {
        let purpose = self
            .db
            .consume_challenge(customer_email, "redemption", code)
            .await?;

        let (cafe_id, user_id, points) = match purpose {
            ChallengePurpose::Redemption {
                cafe_id,
                user_id,
                points,
            } => (cafe_id, user_id, points),
            // The purpose key scopes the lookup; anything else here means
            // the stored challenge does not authorize a redemption.
            _ => return Err(AppError::InvalidOrExpiredChallenge),
        };

        let reward_txn = RewardTransaction {
            id: firestore::generate_id()?,
            user_id: user_id.clone(),
            cafe_id: cafe_id.clone(),
            kind: TransactionKind::Redeem,
            points: -points,
            description: format!("Redeemed {} points", points),
            created_at: format_utc_rfc3339_micros(chrono::Utc::now()),
        };

        let new_balance = self
            .db
            .redeem_points_atomic(&user_id, &cafe_id, points, &reward_txn)
            .await?;

        tracing::info!(
            cafe_id = %cafe_id,
            user_id = %user_id,
            points,
            new_balance,
            "Redemption verified and debited"
        );

        Ok(())
    }
}
