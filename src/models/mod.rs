// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod cafe;
pub mod challenge;
pub mod claim;
pub mod ledger;
pub mod user;

pub use cafe::{Cafe, CafeStatus};
pub use challenge::{Challenge, ChallengePurpose};
pub use claim::{ClaimStatus, RewardClaim};
pub use ledger::{PointsBalance, RewardTransaction, TransactionKind, VisitLog};
pub use user::User;
