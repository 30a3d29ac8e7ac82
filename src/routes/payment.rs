// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token balance and checkout routes.

use crate::error::{AppError, Result};
use crate::middleware::DeviceId;
use crate::services::TokenStatus;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Balance route (requires `X-Device-Id`).
pub fn token_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/tokens", get(get_tokens))
}

/// Checkout route. The device is named in the body, not the header.
pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/checkout", post(create_checkout))
}

async fn get_tokens(
    State(state): State<Arc<AppState>>,
    Extension(device): Extension<DeviceId>,
) -> Result<Json<TokenStatus>> {
    Ok(Json(state.ledger.get_status(device.as_str()).await?))
}

#[derive(Debug, Deserialize)]
struct CheckoutRequest {
    product_sku: String,
    success_url: String,
    device_id: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub checkout_id: String,
}

async fn create_checkout(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    if request.device_id.trim().is_empty() {
        return Err(AppError::BadRequest("device_id required".to_string()));
    }

    let session = state
        .payments
        .create_checkout(
            &request.product_sku,
            &request.success_url,
            &request.device_id,
            state.clock.now(),
        )
        .await?;

    Ok(Json(CheckoutResponse {
        checkout_url: session.checkout_url,
        checkout_id: session.checkout_id,
    }))
}
