// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Short-lived, single-use verification challenges (OTP codes).
//!
//! At most one live challenge exists per `(subject_email, purpose)` key;
//! issuing a new one overwrites the prior one, which becomes invalid
//! immediately. Expired challenges are treated as absent by `consume`
//! regardless of physical deletion timing.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// TTL for registration challenges.
pub const REGISTRATION_TTL_MINUTES: i64 = 10;
/// TTL for redemption challenges.
pub const REDEMPTION_TTL_MINUTES: i64 = 10;
/// TTL for password-reset challenges.
pub const PASSWORD_RESET_TTL_MINUTES: i64 = 5;

/// What a challenge authorizes, with the payload needed to complete the
/// action without re-querying mutable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChallengePurpose {
    /// Verifies a new account's email address.
    Registration,
    /// Authorizes debiting `points` from `(user_id, cafe_id)`,
    /// captured at issuance time.
    Redemption {
        cafe_id: String,
        user_id: String,
        points: i64,
    },
    /// Authorizes a credential reset.
    PasswordReset,
}

impl ChallengePurpose {
    /// Stable key used in the challenge document ID. One live challenge
    /// per `(subject, purpose key)`.
    pub fn storage_key(&self) -> &'static str {
        match self {
            ChallengePurpose::Registration => "registration",
            ChallengePurpose::Redemption { .. } => "redemption",
            ChallengePurpose::PasswordReset => "password_reset",
        }
    }

    /// Default time-to-live for this purpose.
    pub fn ttl(&self) -> Duration {
        match self {
            ChallengePurpose::Registration => Duration::minutes(REGISTRATION_TTL_MINUTES),
            ChallengePurpose::Redemption { .. } => Duration::minutes(REDEMPTION_TTL_MINUTES),
            ChallengePurpose::PasswordReset => Duration::minutes(PASSWORD_RESET_TTL_MINUTES),
        }
    }
}

/// A live challenge stored at `challenges/{subject_email}_{purpose_key}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub subject_email: String,
    /// 6-digit numeric code
    pub code: String,
    pub purpose: ChallengePurpose,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
