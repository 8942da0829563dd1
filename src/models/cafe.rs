// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cafe model. Consulted read-only by the loyalty subsystem.

use serde::{Deserialize, Serialize};

/// Cafe approval status. The approval workflow itself lives elsewhere;
/// redemption and visit recording only require `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CafeStatus {
    Pending,
    Active,
    Rejected,
}

/// Cafe profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cafe {
    /// Document ID
    pub id: String,
    pub name: String,
    pub email: String,
    pub status: CafeStatus,
    /// When the cafe was registered (ISO 8601)
    pub created_at: String,
}

impl Cafe {
    pub fn is_active(&self) -> bool {
        self.status == CafeStatus::Active
    }
}
