// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visit recording service.
//!
//! Converts a monetary spend into points and XP and writes one ledger
//! credit plus the audit records, atomically. Both entry paths converge
//! here: cafe-logged visits and admin-approved claims share one
//! implementation of the point arithmetic.

use crate::db::{firestore, FirestoreDb};
use crate::error::{AppError, Result};
use crate::models::{RewardClaim, RewardTransaction, TransactionKind, VisitLog};
use crate::time_utils::{format_utc_rfc3339, format_utc_rfc3339_micros};

/// Points per 10 currency units spent.
const CURRENCY_UNITS_PER_POINT: i64 = 10;
/// XP granted per point earned.
const XP_PER_POINT: u64 = 2;

/// Compute points and XP for a spend amount.
///
/// `floor(amount / 10)` points; admin-approved credits for multiplier
/// users are scaled by 1.5x, floored. XP is twice the points earned.
pub fn compute_points(amount_spent: i64, from_admin: bool, has_multiplier: bool) -> (i64, u64) {
    let mut points = amount_spent / CURRENCY_UNITS_PER_POINT;
    if from_admin && has_multiplier {
        points = points * 3 / 2;
    }
    let xp = points as u64 * XP_PER_POINT;
    (points, xp)
}

/// Result of recording one visit.
#[derive(Debug)]
pub struct VisitOutcome {
    pub points_earned: i64,
    pub xp_earned: u64,
    pub new_balance: i64,
    pub new_xp: u64,
}

/// Records visits against the ledger.
#[derive(Clone)]
pub struct VisitRecorder {
    db: FirestoreDb,
}

impl VisitRecorder {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Record a cafe-logged visit.
    pub async fn record_visit(
        &self,
        user_id: &str,
        cafe_id: &str,
        amount_spent: i64,
        from_admin: bool,
    ) -> Result<VisitOutcome> {
        self.record(user_id, cafe_id, amount_spent, from_admin, None)
            .await
    }

    /// Record the credit for an admin-approved claim. The claim's
    /// `pending -> approved` transition commits in the same transaction
    /// as the ledger effects.
    pub async fn record_visit_for_claim(&self, claim: &RewardClaim) -> Result<VisitOutcome> {
        self.record(
            &claim.user_id,
            &claim.cafe_id,
            claim.amount,
            true,
            Some(&claim.id),
        )
        .await
    }

    async fn record(
        &self,
        user_id: &str,
        cafe_id: &str,
        amount_spent: i64,
        from_admin: bool,
        approve_claim_id: Option<&str>,
    ) -> Result<VisitOutcome> {
        if amount_spent <= 0 {
            return Err(AppError::BadRequest(
                "amount_spent must be positive".to_string(),
            ));
        }

        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        if !user.verified {
            return Err(AppError::BadRequest(
                "User has not completed registration".to_string(),
            ));
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

        let (points_earned, xp_earned) =
            compute_points(amount_spent, from_admin, user.has_multiplier);

        let now = chrono::Utc::now();
        let visit = VisitLog {
            id: firestore::generate_id()?,
            user_id: user.id.clone(),
            cafe_id: cafe.id.clone(),
            amount_spent,
            points_earned,
            xp_earned,
            recorded_at: format_utc_rfc3339(now),
        };

        let reward_txn = RewardTransaction {
            id: firestore::generate_id()?,
            user_id: user.id.clone(),
            cafe_id: cafe.id.clone(),
            kind: TransactionKind::Earn,
            points: points_earned,
            description: format!(
                "Earned {} points for spending {} at {}",
                points_earned, amount_spent, cafe.name
            ),
            created_at: format_utc_rfc3339_micros(now),
        };

        let (new_balance, new_xp) = self
            .db
            .record_visit_atomic(&visit, &reward_txn, approve_claim_id)
            .await?;

        tracing::info!(
            user_id = %user.id,
            cafe_id = %cafe.id,
            amount_spent,
            points_earned,
            xp_earned,
            from_admin,
            "Visit recorded"
        );

        Ok(VisitOutcome {
            points_earned,
            xp_earned,
            new_balance,
            new_xp,
        })
    }
}
