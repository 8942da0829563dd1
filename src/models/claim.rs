// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin-adjudicated reward claims: the alternate credit path into the
//! ledger. A claim leaves `Pending` at most once.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
}

/// A user-submitted assertion of an off-platform spend, backed by an
/// invoice proof, waiting for admin adjudication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardClaim {
    /// Generated document ID
    pub id: String,
    pub user_id: String,
    pub cafe_id: String,
    /// Claimed spend amount (currency units)
    pub amount: i64,
    /// Opaque URL/reference to the uploaded invoice
    pub invoice_proof: String,
    pub status: ClaimStatus,
    /// When the claim was submitted (ISO 8601)
    pub submitted_at: String,
    /// When the claim left `Pending` (ISO 8601)
    pub processed_at: Option<String>,
}

impl RewardClaim {
    pub fn is_pending(&self) -> bool {
        self.status == ClaimStatus::Pending
    }
}
