// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ledger documents: per-pair balances, visit audit log, and the
//! signed transaction log.
//!
//! The invariant tying these together: for every `(user, cafe)` pair,
//! `PointsBalance.total_points` equals the sum of signed
//! `RewardTransaction.points` for that pair, and is never negative.

use serde::{Deserialize, Serialize};

/// Per-user, per-cafe point balance.
///
/// Stored at `point_balances/{user_id}_{cafe_id}`, created lazily on
/// first credit. All mutation goes through the store's transactional
/// credit/debit operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsBalance {
    pub user_id: String,
    pub cafe_id: String,
    pub total_points: i64,
    /// Last mutation timestamp (ISO 8601)
    pub updated_at: String,
}

/// Direction of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Earn,
    Redeem,
}

/// One entry in the append-only transaction log.
///
/// `points` is signed: positive for `earn`, negative for `redeem`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardTransaction {
    /// Generated document ID
    pub id: String,
    pub user_id: String,
    pub cafe_id: String,
    pub kind: TransactionKind,
    pub points: i64,
    /// Human-readable line for the client activity feed
    pub description: String,
    /// Fixed-width RFC3339 with microseconds, so lexicographic order is
    /// chronological (the transaction feed paginates on this field)
    pub created_at: String,
}

/// Append-only audit record for one credited visit.
///
/// Written in the same transaction as the balance credit it documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitLog {
    /// Generated document ID
    pub id: String,
    pub user_id: String,
    pub cafe_id: String,
    /// Currency units, cafe-provided, trusted
    pub amount_spent: i64,
    pub points_earned: i64,
    pub xp_earned: u64,
    /// When the visit was recorded (ISO 8601)
    pub recorded_at: String,
}
