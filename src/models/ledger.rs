// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-device generation token account and its accounting rules.
//!
//! The rules here are pure. Storage backends apply a [`LedgerOp`] to the
//! current account inside a single atomic read-modify-write, so two
//! concurrent operations on the same device never observe the same balance.

use serde::{Deserialize, Serialize};

/// Free generations granted to every device unless configured otherwise.
pub const DEFAULT_FREE_TRIAL_ALLOTMENT: u32 = 3;

/// Token balance for one device.
///
/// Stored in `token_accounts/{device_id}`. The document ID doubles as the
/// unique key, so concurrent first accesses converge on a single account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub device_id: String,
    /// Paid generations left
    #[serde(default)]
    pub tokens_remaining: u32,
    /// Free generations already used
    #[serde(default)]
    pub free_trial_used: u32,
}

/// Where a consumed generation was paid from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeSource {
    PaidToken,
    FreeTrial,
}

/// An operation applied atomically to a [`TokenAccount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOp {
    /// Read the account, creating it if missing.
    Inspect,
    /// Spend one generation.
    Consume { free_trial_allotment: u32 },
    /// Add paid tokens.
    Credit { amount: u32 },
}

/// What an applied [`LedgerOp`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    Unchanged,
    Consumed(ConsumeSource),
    /// Nothing left to consume; the account was not modified.
    Exhausted,
    Credited { tokens_remaining: u32 },
}

impl LedgerOutcome {
    /// Whether the account must be written back.
    pub fn mutated(&self) -> bool {
        matches!(
            self,
            LedgerOutcome::Consumed(_) | LedgerOutcome::Credited { .. }
        )
    }
}

impl TokenAccount {
    /// A fresh account with no tokens and an unused free trial.
    pub fn new(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            tokens_remaining: 0,
            free_trial_used: 0,
        }
    }

    pub fn free_trial_remaining(&self, allotment: u32) -> u32 {
        allotment.saturating_sub(self.free_trial_used)
    }

    pub fn can_consume(&self, allotment: u32) -> bool {
        self.tokens_remaining > 0 || self.free_trial_remaining(allotment) > 0
    }

    /// Spend one generation. Paid tokens are always drained before the free trial.
    pub fn consume(&mut self, allotment: u32) -> Option<ConsumeSource> {
        if self.tokens_remaining > 0 {
            self.tokens_remaining -= 1;
            return Some(ConsumeSource::PaidToken);
        }

        if self.free_trial_used < allotment {
            self.free_trial_used += 1;
            return Some(ConsumeSource::FreeTrial);
        }

        None
    }

    /// Add paid tokens and return the new balance.
    pub fn credit(&mut self, amount: u32) -> u32 {
        self.tokens_remaining = self.tokens_remaining.saturating_add(amount);
        self.tokens_remaining
    }

    pub fn apply(&mut self, op: LedgerOp) -> LedgerOutcome {
        match op {
            LedgerOp::Inspect => LedgerOutcome::Unchanged,
            LedgerOp::Consume {
                free_trial_allotment,
            } => match self.consume(free_trial_allotment) {
                Some(source) => LedgerOutcome::Consumed(source),
                None => LedgerOutcome::Exhausted,
            },
            LedgerOp::Credit { amount } => LedgerOutcome::Credited {
                tokens_remaining: self.credit(amount),
            },
        }
    }
}
