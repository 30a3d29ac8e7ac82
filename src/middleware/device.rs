// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device identification middleware.
//!
//! Clients have no accounts. Every request names its device in the
//! `X-Device-Id` header and all data is partitioned by that value.

use crate::error::AppError;
use axum::{extract::Request, middleware::Next, response::Response};

pub const DEVICE_ID_HEADER: &str = "x-device-id";

/// Device making the request, inserted as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Middleware that rejects requests without a usable `X-Device-Id`.
pub async fn require_device_id(mut request: Request, next: Next) -> Result<Response, AppError> {
    let device_id = request
        .headers()
        .get(DEVICE_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("X-Device-Id header required".to_string()))?
        .to_string();

    request.extensions_mut().insert(DeviceId(device_id));

    Ok(next.run(request).await)
}
