// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// No paid tokens and no free trial left. An expected business outcome.
    #[error("No generations remaining. Please purchase more.")]
    PaymentRequired,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Payment not configured: {0}")]
    PaymentNotConfigured(String),

    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            AppError::InvalidSignature => StatusCode::UNAUTHORIZED,
            AppError::PaymentNotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::PaymentProvider(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error, details) = match &self {
            AppError::NotFound(msg) => ("not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => ("bad_request", Some(msg.clone())),
            AppError::Validation(msg) => ("validation_error", Some(msg.clone())),
            AppError::PaymentRequired => ("payment_required", Some(self.to_string())),
            AppError::InvalidSignature => ("invalid_signature", None),
            AppError::PaymentNotConfigured(msg) => {
                tracing::error!(reason = %msg, "Payment not configured");
                ("payment_not_configured", Some(msg.clone()))
            }
            AppError::PaymentProvider(msg) => {
                tracing::warn!(error = %msg, "Payment provider error");
                ("payment_provider_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
