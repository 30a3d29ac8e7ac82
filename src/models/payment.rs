// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Token products and payment transaction records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A purchasable token pack. Prices are flat cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Product {
    pub sku: &'static str,
    pub tokens: u32,
    pub price_cents: u32,
}

pub const PRODUCTS: [Product; 3] = [
    Product {
        sku: "starter",
        tokens: 10,
        price_cents: 499,
    },
    Product {
        sku: "popular",
        tokens: 30,
        price_cents: 999,
    },
    Product {
        sku: "pro",
        tokens: 100,
        price_cents: 2499,
    },
];

impl Product {
    pub fn find(sku: &str) -> Option<&'static Product> {
        PRODUCTS.iter().find(|p| p.sku == sku)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

/// One checkout attempt with the payment provider.
///
/// Stored in `payment_transactions/{checkout_id}`, written only after the
/// provider accepted the checkout. Moves from `Pending` to `Completed` once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    /// Provider checkout ID (also used as document ID)
    pub checkout_id: String,
    /// Device that receives the tokens
    pub device_id: String,
    pub product_sku: String,
    pub tokens_granted: u32,
    pub amount_cents: u32,
    pub status: PaymentStatus,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    #[serde(with = "firestore::serialize_as_optional_timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentTransaction {
    pub fn pending(
        checkout_id: &str,
        device_id: &str,
        product: &Product,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            checkout_id: checkout_id.to_string(),
            device_id: device_id.to_string(),
            product_sku: product.sku.to_string(),
            tokens_granted: product.tokens,
            amount_cents: product.price_cents,
            status: PaymentStatus::Pending,
            created_at,
            completed_at: None,
        }
    }

    /// Transition `Pending -> Completed`.
    ///
    /// Returns `false` (leaving the record untouched) if already completed.
    pub fn complete(&mut self, at: DateTime<Utc>) -> bool {
        if self.status == PaymentStatus::Completed {
            return false;
        }
        self.status = PaymentStatus::Completed;
        self.completed_at = Some(at);
        true
    }
}

/// Result of applying a "checkout completed" event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentCompletion {
    /// First delivery: the transaction completed and tokens were granted.
    Credited {
        device_id: String,
        tokens_granted: u32,
        tokens_remaining: u32,
    },
    /// Replayed event; nothing changed.
    AlreadyCompleted,
    /// No transaction with this checkout ID; nothing changed.
    UnknownCheckout,
}
