// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod claims;
pub mod mailer;
pub mod redemption;
pub mod referral;
pub mod visits;

pub use claims::ClaimService;
pub use mailer::MailerService;
pub use redemption::RedemptionService;
pub use referral::ReferralAllocator;
pub use visits::{VisitOutcome, VisitRecorder};
