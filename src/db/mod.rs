//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const CAFES: &str = "cafes";
    /// Per-pair point balances (keyed by `{user_id}_{cafe_id}`)
    pub const POINT_BALANCES: &str = "point_balances";
    pub const VISIT_LOGS: &str = "visit_logs";
    pub const REWARD_TRANSACTIONS: &str = "reward_transactions";
    /// Live OTP challenges (keyed by `{subject_email}_{purpose}`)
    pub const CHALLENGES: &str = "challenges";
    pub const REWARD_CLAIMS: &str = "reward_claims";
}
