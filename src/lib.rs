// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! BrewPoints: cafe loyalty ledger with OTP-gated redemption.
//!
//! This crate provides the backend API for accruing per-cafe point
//! balances and XP, redeeming points through a two-phase OTP challenge,
//! and crediting admin-approved spend claims through the same ledger.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{ClaimService, MailerService, RedemptionService, ReferralAllocator, VisitRecorder};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub mailer: MailerService,
    pub visits: VisitRecorder,
    pub redemption: RedemptionService,
    pub claims: ClaimService,
    pub referrals: ReferralAllocator,
}
