// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook route for Creem payment events.

use crate::error::{AppError, Result};
use crate::services::payments::verify_webhook_signature;
use crate::services::WebhookEvent;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub const SIGNATURE_HEADER: &str = "creem-signature";

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/webhook/creem", post(handle_event))
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}

/// Handle a Creem event (POST).
///
/// The signature covers the raw body, so it is checked before parsing.
/// Storage failures return 500 and Creem redelivers the event.
async fn handle_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let secret = &state.config.creem_webhook_secret;
    if !secret.is_empty() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();

        if !verify_webhook_signature(secret, &body, signature) {
            tracing::warn!(
                has_signature = !signature.is_empty(),
                "Security Alert: Creem webhook signature mismatch"
            );
            return Err(AppError::InvalidSignature);
        }
    }

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Failed to parse Creem webhook");
        AppError::BadRequest("Invalid JSON".to_string())
    })?;

    tracing::info!(event_type = ?event.event_type, "Creem webhook received");

    let outcome = state
        .payments
        .handle_webhook(event, state.clock.now())
        .await?;

    Ok(Json(WebhookAck {
        status: outcome.status(),
    }))
}
