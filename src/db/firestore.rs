// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users and cafes (profile lookups)
//! - Point balances (transactional credit/debit per `(user, cafe)` pair)
//! - Challenges (single-use OTP codes with expiry)
//! - Visit logs and reward transactions (append-only audit records)
//! - Reward claims (admin-adjudicated credits)
//!
//! All multi-document effects are Firestore transactions: the reads and
//! buffered writes commit together or not at all.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    Cafe, Challenge, ChallengePurpose, ClaimStatus, PointsBalance, RewardClaim, RewardTransaction,
    User, VisitLog,
};
use chrono::{Duration, Utc};
use futures_util::{stream, StreamExt};
use ring::rand::{SecureRandom, SystemRandom};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Generate a random document ID (16 random bytes, hex-encoded).
pub fn generate_id() -> Result<String, AppError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
    Ok(hex::encode(bytes))
}

/// Generate a 6-digit numeric OTP code ("100000".."999999").
pub fn generate_otp_code() -> Result<String, AppError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 4];
    rng.fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
    let n = u32::from_be_bytes(bytes) % 900_000 + 100_000;
    Ok(n.to_string())
}

/// Document ID for a `(user, cafe)` balance pair.
pub fn balance_doc_id(user_id: &str, cafe_id: &str) -> String {
    format!("{}_{}", user_id, cafe_id)
}

/// Document ID for a `(subject, purpose)` challenge key.
///
/// The email is percent-encoded so the `_` separator stays unambiguous.
pub fn challenge_doc_id(subject_email: &str, purpose_key: &str) -> String {
    format!("{}_{}", urlencoding::encode(subject_email), purpose_key)
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by document ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Find a user by phone number (the primary external key).
    pub async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, AppError> {
        self.find_one_user("phone", phone).await
    }

    /// Find a user by email address.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_one_user("email", email).await
    }

    /// Find a user by their referral code.
    pub async fn find_user_by_referral_code(&self, code: &str) -> Result<Option<User>, AppError> {
        self.find_one_user("referral_code", code).await
    }

    async fn find_one_user(&self, field: &str, value: &str) -> Result<Option<User>, AppError> {
        let value = value.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field(field).eq(value.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    // ─── Cafe Operations ─────────────────────────────────────────

    /// Get a cafe by ID.
    pub async fn get_cafe(&self, cafe_id: &str) -> Result<Option<Cafe>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CAFES)
            .obj()
            .one(cafe_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a cafe.
    pub async fn upsert_cafe(&self, cafe: &Cafe) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CAFES)
            .document_id(&cafe.id)
            .object(cafe)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Ledger Operations ───────────────────────────────────────

    /// Get the point balance for a `(user, cafe)` pair.
    ///
    /// Returns 0 if no balance document exists yet.
    pub async fn get_balance(&self, user_id: &str, cafe_id: &str) -> Result<i64, AppError> {
        let balance: Option<PointsBalance> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::POINT_BALANCES)
            .obj()
            .one(&balance_doc_id(user_id, cafe_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(balance.map(|b| b.total_points).unwrap_or(0))
    }

    /// Get all per-cafe balances for a user.
    pub async fn get_balances_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<PointsBalance>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::POINT_BALANCES)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically record a visit credit: balance increment, XP increment,
    /// visit log, and reward transaction commit together or not at all.
    ///
    /// When `approve_claim_id` is set, the claim's `pending -> approved`
    /// transition joins the same transaction; a claim that is no longer
    /// pending aborts the whole operation with `AlreadyProcessed`, so a
    /// claim can never be approved without its credit or credited twice.
    ///
    /// Returns `(new_balance, new_xp)`.
    pub async fn record_visit_atomic(
        &self,
        visit: &VisitLog,
        reward_txn: &RewardTransaction,
        approve_claim_id: Option<&str>,
    ) -> Result<(i64, u64), AppError> {
        let pair_id = balance_doc_id(&visit.user_id, &visit.cafe_id);
        let now = Utc::now().to_rfc3339();

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Current balance for the pair (may not exist yet)
        let current: Option<PointsBalance> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::POINT_BALANCES)
            .obj()
            .one(&pair_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read balance in transaction: {}", e))
            })?;

        let new_total = current.map(|b| b.total_points).unwrap_or(0) + visit.points_earned;
        let balance = PointsBalance {
            user_id: visit.user_id.clone(),
            cafe_id: visit.cafe_id.clone(),
            total_points: new_total,
            updated_at: now.clone(),
        };

        // XP lives on the user document; re-read inside the transaction
        let mut user: User = match self.get_user(&visit.user_id).await? {
            Some(user) => user,
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound(format!(
                    "User {} not found",
                    visit.user_id
                )));
            }
        };
        user.xp += visit.xp_earned;

        // Claim transition, if this credit settles an approved claim
        let approved_claim = match approve_claim_id {
            Some(claim_id) => {
                let claim = self.get_claim(claim_id).await?;
                match claim {
                    None => {
                        let _ = transaction.rollback().await;
                        return Err(AppError::NotFound(format!("Claim {} not found", claim_id)));
                    }
                    Some(claim) if !claim.is_pending() => {
                        let _ = transaction.rollback().await;
                        return Err(AppError::AlreadyProcessed);
                    }
                    Some(mut claim) => {
                        claim.status = ClaimStatus::Approved;
                        claim.processed_at = Some(now.clone());
                        Some(claim)
                    }
                }
            }
            None => None,
        };

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::POINT_BALANCES)
            .document_id(&pair_id)
            .object(&balance)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add balance to transaction: {}", e))
            })?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::VISIT_LOGS)
            .document_id(&visit.id)
            .object(visit)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add visit log to transaction: {}", e))
            })?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::REWARD_TRANSACTIONS)
            .document_id(&reward_txn.id)
            .object(reward_txn)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add transaction log entry: {}", e))
            })?;

        if let Some(claim) = &approved_claim {
            self.get_client()?
                .fluent()
                .update()
                .in_col(collections::REWARD_CLAIMS)
                .document_id(&claim.id)
                .object(claim)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add claim to transaction: {}", e))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            user_id = %visit.user_id,
            cafe_id = %visit.cafe_id,
            points = visit.points_earned,
            xp = visit.xp_earned,
            new_balance = new_total,
            claim_id = ?approve_claim_id,
            "Visit recorded atomically"
        );

        Ok((new_total, user.xp))
    }

    /// Atomically debit points from a `(user, cafe)` pair and append the
    /// matching `redeem` transaction.
    ///
    /// The balance check and the decrement are one transaction; the balance
    /// can never go negative, including under concurrent debit attempts.
    ///
    /// Returns the new balance.
    pub async fn redeem_points_atomic(
        &self,
        user_id: &str,
        cafe_id: &str,
        points: i64,
        reward_txn: &RewardTransaction,
    ) -> Result<i64, AppError> {
        let pair_id = balance_doc_id(user_id, cafe_id);

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let current: Option<PointsBalance> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::POINT_BALANCES)
            .obj()
            .one(&pair_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read balance in transaction: {}", e))
            })?;

        let available = current.as_ref().map(|b| b.total_points).unwrap_or(0);
        if points > available {
            let _ = transaction.rollback().await;
            return Err(AppError::InsufficientBalance {
                requested: points,
                available,
            });
        }

        let balance = PointsBalance {
            user_id: user_id.to_string(),
            cafe_id: cafe_id.to_string(),
            total_points: available - points,
            updated_at: Utc::now().to_rfc3339(),
        };

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::POINT_BALANCES)
            .document_id(&pair_id)
            .object(&balance)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add balance to transaction: {}", e))
            })?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::REWARD_TRANSACTIONS)
            .document_id(&reward_txn.id)
            .object(reward_txn)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add transaction log entry: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            user_id,
            cafe_id,
            points,
            new_balance = balance.total_points,
            "Points redeemed atomically"
        );

        Ok(balance.total_points)
    }

    /// Atomically mark a user verified and grant signup XP, optionally
    /// granting referral XP to the referrer in the same transaction.
    ///
    /// A user never exists in the verified state without their signup XP.
    pub async fn activate_user_atomic(
        &self,
        user_id: &str,
        self_grant: u64,
        referrer_grant: Option<(&str, u64)>,
    ) -> Result<User, AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let mut user: User = match self.get_user(user_id).await? {
            Some(user) => user,
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound(format!("User {} not found", user_id)));
            }
        };

        if user.verified {
            let _ = transaction.rollback().await;
            return Err(AppError::BadRequest(
                "User is already verified".to_string(),
            ));
        }

        user.verified = true;
        user.xp += self_grant;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        if let Some((referrer_id, grant)) = referrer_grant {
            match self.get_user(referrer_id).await? {
                Some(mut referrer) => {
                    referrer.xp += grant;
                    self.get_client()?
                        .fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&referrer.id)
                        .object(&referrer)
                        .add_to_transaction(&mut transaction)
                        .map_err(|e| {
                            AppError::Database(format!(
                                "Failed to add referrer to transaction: {}",
                                e
                            ))
                        })?;
                }
                None => {
                    // Referrer resolved moments ago; activation must not fail on this
                    tracing::warn!(referrer_id, "Referrer vanished, skipping referral grant");
                }
            }
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            user_id,
            xp_granted = self_grant,
            referred = referrer_grant.is_some(),
            "User activated with signup XP"
        );

        Ok(user)
    }

    // ─── Challenge Operations ────────────────────────────────────

    /// Issue a challenge for `(subject, purpose)` with the given TTL.
    ///
    /// Upserts by key: a prior live challenge for the same key is
    /// overwritten and its code becomes invalid immediately. Only the
    /// newest issuance is valid.
    pub async fn issue_challenge(
        &self,
        subject_email: &str,
        purpose: ChallengePurpose,
        ttl: Duration,
    ) -> Result<Challenge, AppError> {
        let now = Utc::now();
        let challenge = Challenge {
            subject_email: subject_email.to_string(),
            code: generate_otp_code()?,
            purpose,
            issued_at: now,
            expires_at: now + ttl,
        };

        let doc_id = challenge_doc_id(subject_email, challenge.purpose.storage_key());
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CHALLENGES)
            .document_id(&doc_id)
            .object(&challenge)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            subject = subject_email,
            purpose = challenge.purpose.storage_key(),
            expires_at = %challenge.expires_at,
            "Challenge issued"
        );

        Ok(challenge)
    }

    /// Get the live challenge for `(subject, purpose)`, if any.
    pub async fn get_challenge(
        &self,
        subject_email: &str,
        purpose_key: &str,
    ) -> Result<Option<Challenge>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CHALLENGES)
            .obj()
            .one(&challenge_doc_id(subject_email, purpose_key))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete the challenge for `(subject, purpose)`.
    ///
    /// Used to retract a challenge whose notification never reached the
    /// subject. Deleting an absent challenge is not an error.
    pub async fn delete_challenge(
        &self,
        subject_email: &str,
        purpose_key: &str,
    ) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::CHALLENGES)
            .document_id(&challenge_doc_id(subject_email, purpose_key))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Consume a challenge: look up by `(subject, purpose)`, match the
    /// code, and delete it in one transaction. Returns the purpose payload
    /// on success.
    ///
    /// Fails with `InvalidOrExpiredChallenge` if the challenge is absent,
    /// expired, or the code does not match; a mismatched code leaves the
    /// challenge live. Concurrent consume attempts for the same key result
    /// in at most one success.
    pub async fn consume_challenge(
        &self,
        subject_email: &str,
        purpose_key: &str,
        code: &str,
    ) -> Result<ChallengePurpose, AppError> {
        let doc_id = challenge_doc_id(subject_email, purpose_key);

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let challenge: Option<Challenge> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CHALLENGES)
            .obj()
            .one(&doc_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read challenge in transaction: {}", e))
            })?;

        let challenge = match challenge {
            Some(challenge) => challenge,
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::InvalidOrExpiredChallenge);
            }
        };

        // Expired entries are treated as absent; physical deletion happens
        // on the next issuance for this key.
        if challenge.is_expired_at(Utc::now()) {
            let _ = transaction.rollback().await;
            return Err(AppError::InvalidOrExpiredChallenge);
        }

        if challenge.code != code {
            let _ = transaction.rollback().await;
            return Err(AppError::InvalidOrExpiredChallenge);
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::CHALLENGES)
            .document_id(&doc_id)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add deletion to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            subject = subject_email,
            purpose = purpose_key,
            "Challenge consumed"
        );

        Ok(challenge.purpose)
    }

    /// Physically delete challenges past their expiry.
    ///
    /// Expired challenges are already treated as absent by `consume`;
    /// this reclaims the storage. Uses concurrent deletes with a limit
    /// to avoid overloading Firestore.
    ///
    /// Returns the number of challenges deleted.
    pub async fn purge_expired_challenges(&self) -> Result<usize, AppError> {
        let now = Utc::now();

        let challenges: Vec<Challenge> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::CHALLENGES)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let expired_ids: Vec<String> = challenges
            .iter()
            .filter(|c| c.is_expired_at(now))
            .map(|c| challenge_doc_id(&c.subject_email, c.purpose.storage_key()))
            .collect();

        let count = expired_ids.len();
        let client = self.get_client()?;

        stream::iter(expired_ids)
            .map(|doc_id| async move {
                client
                    .fluent()
                    .delete()
                    .from(collections::CHALLENGES)
                    .document_id(&doc_id)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                Ok::<_, AppError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        if count > 0 {
            tracing::info!(count, "Purged expired challenges");
        }

        Ok(count)
    }

    // ─── Claim Operations ────────────────────────────────────────

    /// Get a reward claim by ID.
    pub async fn get_claim(&self, claim_id: &str) -> Result<Option<RewardClaim>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REWARD_CLAIMS)
            .obj()
            .one(claim_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a new reward claim.
    pub async fn create_claim(&self, claim: &RewardClaim) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REWARD_CLAIMS)
            .document_id(&claim.id)
            .object(claim)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List claims by status, oldest submissions first.
    pub async fn list_claims_by_status(
        &self,
        status: ClaimStatus,
        limit: u32,
    ) -> Result<Vec<RewardClaim>, AppError> {
        let status_str = match status {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
        };

        self.get_client()?
            .fluent()
            .select()
            .from(collections::REWARD_CLAIMS)
            .filter(move |q| q.for_all([q.field("status").eq(status_str)]))
            .order_by([(
                "submitted_at",
                firestore::FirestoreQueryDirection::Ascending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically transition a claim `pending -> rejected`. Terminal, no
    /// ledger effect. Fails with `AlreadyProcessed` if the claim has
    /// already left `pending`.
    pub async fn reject_claim_atomic(&self, claim_id: &str) -> Result<RewardClaim, AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let mut claim = match self.get_claim(claim_id).await? {
            Some(claim) => claim,
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound(format!("Claim {} not found", claim_id)));
            }
        };

        if !claim.is_pending() {
            let _ = transaction.rollback().await;
            return Err(AppError::AlreadyProcessed);
        }

        claim.status = ClaimStatus::Rejected;
        claim.processed_at = Some(Utc::now().to_rfc3339());

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::REWARD_CLAIMS)
            .document_id(&claim.id)
            .object(&claim)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add claim to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(claim_id, "Claim rejected");

        Ok(claim)
    }

    // ─── Transaction Feed ────────────────────────────────────────

    /// Get reward transactions for a `(user, cafe)` pair, newest first,
    /// with optional cursor-based pagination (`before` is an RFC3339
    /// timestamp as stored in `created_at`).
    pub async fn get_transactions_for_pair(
        &self,
        user_id: &str,
        cafe_id: &str,
        before: Option<String>,
        limit: u32,
    ) -> Result<Vec<RewardTransaction>, AppError> {
        let user_id = user_id.to_string();
        let cafe_id = cafe_id.to_string();

        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::REWARD_TRANSACTIONS);

        let query = if let Some(before) = before {
            query.filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("cafe_id").eq(cafe_id.clone()),
                    q.field("created_at").less_than(before.clone()),
                ])
            })
        } else {
            query.filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("cafe_id").eq(cafe_id.clone()),
                ])
            })
        };

        query
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_code_shape() {
        for _ in 0..32 {
            let code = generate_otp_code().unwrap();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_id().unwrap();
        let b = generate_id().unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_challenge_doc_id_encodes_email() {
        let id = challenge_doc_id("a+b@example.com", "redemption");
        assert_eq!(id, "a%2Bb%40example.com_redemption");
    }

    #[test]
    fn test_balance_doc_id() {
        assert_eq!(balance_doc_id("u1", "c1"), "u1_c1");
    }
}
