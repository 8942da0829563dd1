// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin adjudication of reward claims.
//!
//! Approval routes the credit through the shared visit recorder, so the
//! two entry paths into the ledger cannot drift apart.

use crate::db::{firestore, FirestoreDb};
use crate::error::{AppError, Result};
use crate::models::{ClaimStatus, RewardClaim};
use crate::services::visits::{VisitOutcome, VisitRecorder};
use crate::time_utils::format_utc_rfc3339;

#[derive(Clone)]
pub struct ClaimService {
    db: FirestoreDb,
    visits: VisitRecorder,
}

impl ClaimService {
    pub fn new(db: FirestoreDb, visits: VisitRecorder) -> Self {
        Self { db, visits }
    }

    /// Submit a new claim for adjudication.
    pub async fn submit(
        &self,
        user_id: &str,
        cafe_id: &str,
        amount: i64,
        invoice_proof: &str,
    ) -> Result<RewardClaim> {
        if amount <= 0 {
            return Err(AppError::BadRequest(
                "Claim amount must be positive".to_string(),
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

        let claim = RewardClaim {
            id: firestore::generate_id()?,
            user_id: user_id.to_string(),
            cafe_id: cafe_id.to_string(),
            amount,
            invoice_proof: invoice_proof.to_string(),
            status: ClaimStatus::Pending,
            submitted_at: format_utc_rfc3339(chrono::Utc::now()),
            processed_at: None,
        };

        self.db.create_claim(&claim).await?;

        tracing::info!(claim_id = %claim.id, user_id, cafe_id, amount, "Claim submitted");

        Ok(claim)
    }

    /// Approve a pending claim and credit the ledger.
    ///
    /// The status transition and the credit commit in one store
    /// transaction; a claim that has already left `pending` fails with
    /// `AlreadyProcessed` and nothing is written.
    pub async fn approve(&self, claim_id: &str) -> Result<VisitOutcome> {
        let claim = self
            .db
            .get_claim(claim_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Claim {} not found", claim_id)))?;

        // Fast-path check; the authoritative check happens inside the
        // recording transaction.
        if !claim.is_pending() {
            return Err(AppError::AlreadyProcessed);
        }

        let outcome = self.visits.record_visit_for_claim(&claim).await?;

        tracing::info!(
            claim_id,
            points = outcome.points_earned,
            "Claim approved and credited"
        );

        Ok(outcome)
    }

    /// Reject a pending claim. Terminal; no ledger effect.
    pub async fn reject(&self, claim_id: &str) -> Result<RewardClaim> {
        let claim = self.db.reject_claim_atomic(claim_id).await?;
        tracing::info!(claim_id, "Claim rejected");
        Ok(claim)
    }
}
