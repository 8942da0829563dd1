// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signup and referral XP grants.
//!
//! Fired exactly once, when a registration challenge is verified. The
//! grants commit atomically with the user's activation: a verified user
//! never exists without their base signup XP.

use crate::error::Result;
use crate::db::FirestoreDb;
use crate::models::User;
use ring::rand::{SecureRandom, SystemRandom};

/// Flat XP granted to every user at verification.
pub const SIGNUP_BONUS_XP: u64 = 100;
/// XP granted to the referrer when a referred user verifies.
pub const REFERRER_BONUS_XP: u64 = 200;
/// Additional XP granted to the referred user (on top of the base).
pub const REFEREE_BONUS_XP: u64 = 150;

const REFERRAL_CODE_LEN: usize = 8;
const REFERRAL_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate a referral code (8 chars, unambiguous uppercase alphabet).
pub fn generate_referral_code() -> Result<String> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; REFERRAL_CODE_LEN];
    rng.fill(&mut bytes)
        .map_err(|_| crate::error::AppError::Internal(anyhow::anyhow!("System RNG failure")))?;

    Ok(bytes
        .iter()
        .map(|b| REFERRAL_CODE_ALPHABET[*b as usize % REFERRAL_CODE_ALPHABET.len()] as char)
        .collect())
}

/// Allocates signup and referral XP at activation time.
#[derive(Clone)]
pub struct ReferralAllocator {
    db: FirestoreDb,
}

impl ReferralAllocator {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Mark `user` verified and grant signup XP, plus referral bonuses
    /// when `referred_by` names a real referral code. One transaction.
    ///
    /// Returns the activated user.
    pub async fn activate_and_grant(&self, user: &User) -> Result<User> {
        let mut self_grant = SIGNUP_BONUS_XP;
        let mut referrer_grant: Option<(String, u64)> = None;

        if let Some(code) = &user.referred_by {
            match self.db.find_user_by_referral_code(code).await? {
                Some(referrer) if referrer.id != user.id => {
                    self_grant += REFEREE_BONUS_XP;
                    referrer_grant = Some((referrer.id, REFERRER_BONUS_XP));
                }
                Some(_) => {
                    tracing::warn!(user_id = %user.id, "User referred by own code, ignoring");
                }
                None => {
                    tracing::debug!(
                        user_id = %user.id,
                        "Referral code does not resolve, granting base XP only"
                    );
                }
            }
        }

        let activated = self
            .db
            .activate_user_atomic(
                &user.id,
                self_grant,
                referrer_grant.as_ref().map(|(id, xp)| (id.as_str(), *xp)),
            )
            .await?;

        tracing::info!(
            user_id = %user.id,
            xp_granted = self_grant,
            referred = referrer_grant.is_some(),
            "Signup XP allocated"
        );

        Ok(activated)
    }
}
