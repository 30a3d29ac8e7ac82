// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod contact;
pub mod health;
pub mod ledger;
pub mod payment;

pub use contact::{Contact, ContactCadence, Interaction, RelationKind};
pub use health::{HealthAssessment, HealthStatus};
pub use ledger::{ConsumeSource, LedgerOp, LedgerOutcome, TokenAccount};
pub use payment::{PaymentCompletion, PaymentStatus, PaymentTransaction, Product};
