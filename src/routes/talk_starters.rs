// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Conversation starter generation (costs one token or free-trial use).

use crate::error::{AppError, Result};
use crate::middleware::DeviceId;
use crate::services::contacts::context_preview;
use crate::services::StarterRequest;
use crate::AppState;
use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/talk-starters", post(generate_talk_starters))
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Deserialize)]
struct TalkStarterRequest {
    friend_id: String,
    #[serde(default = "default_language")]
    language: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TalkStarterResponse {
    pub starters: Vec<String>,
    pub context_used: String,
}

/// Generate starters for one contact.
///
/// Capacity is checked before the generator runs and consumed after it
/// returns. No ledger operation spans the LLM call.
async fn generate_talk_starters(
    State(state): State<Arc<AppState>>,
    Extension(device): Extension<DeviceId>,
    Json(request): Json<TalkStarterRequest>,
) -> Result<Json<TalkStarterResponse>> {
    let device_id = device.as_str();

    if !state.ledger.can_consume(device_id).await? {
        return Err(AppError::PaymentRequired);
    }

    let contact = state
        .db
        .get_contact(device_id, &request.friend_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Friend not found".to_string()))?;

    let context = state.contacts.interaction_context(&contact.id).await?;

    let outcome = state
        .generator
        .generate(&StarterRequest {
            name: &contact.name,
            relation: contact.relation.as_str(),
            context: &context,
            language: &request.language,
        })
        .await;

    let fallback = outcome.is_fallback();

    // Fallback starters are charged too.
    if !state.ledger.consume(device_id).await? {
        tracing::warn!(
            device_id,
            contact_id = %contact.id,
            "Balance exhausted by a concurrent request, returning starters anyway"
        );
    }

    tracing::info!(
        device_id,
        contact_id = %contact.id,
        language = %request.language,
        fallback,
        "Talk starters generated"
    );

    Ok(Json(TalkStarterResponse {
        starters: outcome.into_starters(),
        context_used: context_preview(&context),
    }))
}
