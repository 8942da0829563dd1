//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
///
/// Per-cafe point balances live in their own `point_balances` collection,
/// keyed by `(user_id, cafe_id)`; only the global XP counter is embedded here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Generated document ID
    pub id: String,
    /// Phone number (unique, primary external key)
    pub phone: String,
    /// Email address (unique, challenge subject)
    pub email: String,
    /// Display name
    pub name: String,
    /// Experience points. Monotonically increasing; never spent.
    #[serde(default)]
    pub xp: u64,
    /// Unique referral token generated at creation
    pub referral_code: String,
    /// Another user's referral code, set once at creation
    pub referred_by: Option<String>,
    /// Scales admin-approved credits by 1.5x
    #[serde(default)]
    pub has_multiplier: bool,
    /// Set once the registration challenge is verified
    #[serde(default)]
    pub verified: bool,
    /// When the user registered (ISO 8601)
    pub created_at: String,
}
