// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod contacts;
pub mod generator;
pub mod ledger;
pub mod payments;

pub use contacts::ContactService;
pub use generator::{GenerationOutcome, StarterGenerator, StarterRequest};
pub use ledger::{TokenLedger, TokenStatus};
pub use payments::{CreemClient, PaymentService, WebhookEvent, WebhookOutcome};
