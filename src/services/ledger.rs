// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token ledger: paid balance and free-trial accounting per device.
//!
//! Every operation is one atomic read-modify-write against the device's
//! account (see [`Storage::apply_ledger_op`]). Operations on different
//! devices never contend, and none of them touch the network beyond storage.

use crate::db::Storage;
use crate::error::{AppError, Result};
use crate::models::{ConsumeSource, LedgerOp, LedgerOutcome};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Balance visible to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TokenStatus {
    pub tokens_remaining: u32,
    pub free_trial_remaining: u32,
}

/// Per-device generation token ledger.
#[derive(Clone)]
pub struct TokenLedger {
    db: Arc<dyn Storage>,
    free_trial_allotment: u32,
}

impl TokenLedger {
    pub fn new(db: Arc<dyn Storage>, free_trial_allotment: u32) -> Self {
        Self {
            db,
            free_trial_allotment,
        }
    }

    pub fn free_trial_allotment(&self) -> u32 {
        self.free_trial_allotment
    }

    /// Current balance. Creates a zeroed account on first access.
    pub async fn get_status(&self, device_id: &str) -> Result<TokenStatus> {
        let (account, _) = self.db.apply_ledger_op(device_id, LedgerOp::Inspect).await?;
        Ok(TokenStatus {
            tokens_remaining: account.tokens_remaining,
            free_trial_remaining: account.free_trial_remaining(self.free_trial_allotment),
        })
    }

    /// Whether one more generation may be attempted.
    pub async fn can_consume(&self, device_id: &str) -> Result<bool> {
        let status = self.get_status(device_id).await?;
        Ok(status.tokens_remaining > 0 || status.free_trial_remaining > 0)
    }

    /// Spend one generation: a paid token if any, otherwise a free-trial use.
    ///
    /// Returns `false` without modifying the account when nothing is left.
    pub async fn consume(&self, device_id: &str) -> Result<bool> {
        let op = LedgerOp::Consume {
            free_trial_allotment: self.free_trial_allotment,
        };
        let (account, outcome) = self.db.apply_ledger_op(device_id, op).await?;

        match outcome {
            LedgerOutcome::Consumed(source) => {
                tracing::info!(
                    device_id,
                    source = match source {
                        ConsumeSource::PaidToken => "paid_token",
                        ConsumeSource::FreeTrial => "free_trial",
                    },
                    tokens_remaining = account.tokens_remaining,
                    free_trial_used = account.free_trial_used,
                    "Generation consumed"
                );
                Ok(true)
            }
            _ => {
                tracing::debug!(device_id, "No generations remaining");
                Ok(false)
            }
        }
    }

    /// Add paid tokens and return the new balance.
    ///
    /// Purchases do not go through here: `Storage::complete_payment` credits
    /// the account in the same unit of work that marks the payment completed.
    pub async fn credit(&self, device_id: &str, amount: u32) -> Result<u32> {
        if amount == 0 {
            return Err(AppError::BadRequest(
                "Credit amount must be positive".to_string(),
            ));
        }

        let (account, _) = self
            .db
            .apply_ledger_op(device_id, LedgerOp::Credit { amount })
            .await?;

        tracing::info!(
            device_id,
            amount,
            tokens_remaining = account.tokens_remaining,
            "Tokens credited"
        );
        Ok(account.tokens_remaining)
    }
}
