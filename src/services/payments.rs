// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token purchases through Creem.
//!
//! Handles:
//! - Checkout session creation (persists a pending transaction)
//! - Webhook signature verification
//! - Idempotent completion of `checkout.completed` events

use crate::db::Storage;
use crate::error::{AppError, Result};
use crate::models::{PaymentCompletion, PaymentTransaction, Product};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Webhook event that completes a purchase.
pub const CHECKOUT_COMPLETED: &str = "checkout.completed";

/// Creem REST client.
#[derive(Clone)]
pub struct CreemClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct CheckoutRequest<'a> {
    product_id: &'a str,
    success_url: &'a str,
    metadata: CheckoutMetadata,
}

/// Metadata attached to a checkout and echoed back in webhooks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    pub device_id: Option<String>,
    pub product_sku: Option<String>,
}

/// Checkout session as returned by Creem.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    #[serde(rename = "id")]
    pub checkout_id: String,
    pub checkout_url: String,
}

impl CreemClient {
    pub fn new(base_url: String, api_key: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Create a hosted checkout for one Creem product.
    pub async fn create_checkout(
        &self,
        product_id: &str,
        success_url: &str,
        device_id: &str,
        product_sku: &str,
    ) -> Result<CheckoutSession> {
        let body = CheckoutRequest {
            product_id,
            success_url,
            metadata: CheckoutMetadata {
                device_id: Some(device_id.to_string()),
                product_sku: Some(product_sku.to_string()),
            },
        };

        let response = self
            .http
            .post(format!("{}/v1/checkouts", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::PaymentProvider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::PaymentProvider(format!(
                "Creem API error {}: {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("Invalid checkout response: {}", e)))
    }
}

/// Check a `creem-signature` header: hex HMAC-SHA256 of the raw body.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    let provided = signature_hex.trim().to_ascii_lowercase();
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

// ─── Webhook Payload ─────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEvent {
    pub event_type: Option<String>,
    #[serde(default)]
    pub object: WebhookObject,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookObject {
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: CheckoutMetadata,
}

/// Result of handling one webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Completed(PaymentCompletion),
    MissingMetadata,
    Ignored,
}

impl WebhookOutcome {
    /// Status string acknowledged to Creem.
    pub fn status(&self) -> &'static str {
        match self {
            WebhookOutcome::Completed(_) => "ok",
            WebhookOutcome::MissingMetadata => "missing metadata",
            WebhookOutcome::Ignored => "ignored",
        }
    }
}

// ─── Payment Service ─────────────────────────────────────────

#[derive(Clone)]
pub struct PaymentService {
    db: Arc<dyn Storage>,
    client: CreemClient,
    /// Product SKU -> Creem product ID
    product_ids: HashMap<String, String>,
}

impl PaymentService {
    pub fn new(
        db: Arc<dyn Storage>,
        client: CreemClient,
        product_ids: HashMap<String, String>,
    ) -> Self {
        Self {
            db,
            client,
            product_ids,
        }
    }

    /// Start a purchase. Nothing is stored unless Creem accepts the checkout.
    pub async fn create_checkout(
        &self,
        product_sku: &str,
        success_url: &str,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckoutSession> {
        let product = Product::find(product_sku)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid product: {}", product_sku)))?;

        if !self.client.is_configured() {
            return Err(AppError::PaymentNotConfigured(
                "Payment not configured".to_string(),
            ));
        }

        let creem_product_id = self.product_ids.get(product.sku).ok_or_else(|| {
            AppError::PaymentNotConfigured(format!(
                "Product {} not configured in Creem",
                product.sku
            ))
        })?;

        let session = self
            .client
            .create_checkout(creem_product_id, success_url, device_id, product.sku)
            .await?;

        let transaction =
            PaymentTransaction::pending(&session.checkout_id, device_id, product, now);
        self.db.insert_payment(&transaction).await?;

        tracing::info!(
            device_id,
            checkout_id = %session.checkout_id,
            product_sku = product.sku,
            amount_cents = product.price_cents,
            "Checkout created"
        );

        Ok(session)
    }

    /// Apply a verified webhook event.
    ///
    /// Completion is idempotent: a repeated or unknown checkout is acknowledged
    /// without crediting anything.
    pub async fn handle_webhook(
        &self,
        event: WebhookEvent,
        now: DateTime<Utc>,
    ) -> Result<WebhookOutcome> {
        if event.event_type.as_deref() != Some(CHECKOUT_COMPLETED) {
            tracing::debug!(event_type = ?event.event_type, "Ignoring webhook event");
            return Ok(WebhookOutcome::Ignored);
        }

        let WebhookObject { id, metadata } = event.object;
        let (Some(metadata_device), Some(product_sku)) = (
            metadata.device_id.filter(|s| !s.is_empty()),
            metadata.product_sku.filter(|s| !s.is_empty()),
        ) else {
            tracing::warn!(checkout_id = ?id, "Checkout completed without metadata");
            return Ok(WebhookOutcome::MissingMetadata);
        };

        let Some(checkout_id) = id else {
            tracing::warn!("Checkout completed without checkout id");
            return Ok(WebhookOutcome::Completed(PaymentCompletion::UnknownCheckout));
        };

        let completion = self.db.complete_payment(&checkout_id, now).await?;

        match &completion {
            PaymentCompletion::Credited {
                device_id,
                tokens_granted,
                tokens_remaining,
            } => {
                if *device_id != metadata_device {
                    tracing::warn!(
                        checkout_id = %checkout_id,
                        stored_device = %device_id,
                        metadata_device = %metadata_device,
                        "Webhook metadata device differs from checkout, crediting checkout device"
                    );
                }
                tracing::info!(
                    checkout_id = %checkout_id,
                    device_id = %device_id,
                    product_sku = %product_sku,
                    tokens_granted,
                    tokens_remaining,
                    "Payment completed"
                );
            }
            PaymentCompletion::AlreadyCompleted => {
                tracing::info!(checkout_id = %checkout_id, "Duplicate checkout.completed ignored");
            }
            PaymentCompletion::UnknownCheckout => {
                tracing::warn!(checkout_id = %checkout_id, "checkout.completed for unknown checkout");
            }
        }

        Ok(WebhookOutcome::Completed(completion))
    }
}
