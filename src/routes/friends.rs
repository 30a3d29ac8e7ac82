// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contact ("friend") routes: CRUD, health views and interaction logging.

use crate::db::generate_id;
use crate::error::{AppError, Result};
use crate::middleware::DeviceId;
use crate::models::health::{select_needing_contact, ContactHealth};
use crate::models::{Contact, ContactCadence, HealthStatus, Interaction, RelationKind};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Interactions shown on the contact detail view.
const DETAIL_INTERACTIONS: u32 = 20;

/// Entries per dashboard list.
const DASHBOARD_LIST_LEN: usize = 5;

/// Friend routes (require `X-Device-Id`, applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/friends", get(list_friends).post(create_friend))
        .route("/api/v1/friends/dashboard", get(get_dashboard))
        .route("/api/v1/friends/needing-contact", get(get_needing_contact))
        .route(
            "/api/v1/friends/{id}",
            get(get_friend).patch(update_friend).delete(delete_friend),
        )
        .route("/api/v1/friends/{id}/interactions", post(log_interaction))
}

// ─── Responses ───────────────────────────────────────────────

/// Contact with derived health.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FriendResponse {
    pub id: String,
    pub name: String,
    pub nickname: Option<String>,
    pub relation_type: RelationKind,
    pub contact_frequency: ContactCadence,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_interaction: Option<String>,
    pub health_status: HealthStatus,
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub days_since_contact: Option<i64>,
}

impl From<ContactHealth> for FriendResponse {
    fn from(entry: ContactHealth) -> Self {
        let ContactHealth {
            contact,
            last_interaction_at,
            health,
        } = entry;

        Self {
            id: contact.id,
            name: contact.name,
            nickname: contact.nickname,
            relation_type: contact.relation,
            contact_frequency: contact.cadence,
            notes: contact.notes,
            created_at: format_utc_rfc3339(contact.created_at),
            updated_at: format_utc_rfc3339(contact.updated_at),
            last_interaction: last_interaction_at.map(format_utc_rfc3339),
            health_status: health.status,
            days_since_contact: health.days_since_contact,
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct InteractionResponse {
    pub id: String,
    pub friend_id: String,
    pub contacted_at: String,
    pub summary: Option<String>,
    pub next_topics: Option<Vec<String>>,
    pub created_at: String,
}

impl From<Interaction> for InteractionResponse {
    fn from(interaction: Interaction) -> Self {
        Self {
            id: interaction.id,
            friend_id: interaction.contact_id,
            contacted_at: format_utc_rfc3339(interaction.contacted_at),
            summary: interaction.summary,
            next_topics: interaction.next_topics,
            created_at: format_utc_rfc3339(interaction.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FriendDetailResponse {
    #[serde(flatten)]
    #[cfg_attr(feature = "binding-generation", ts(flatten))]
    pub friend: FriendResponse,
    pub interactions: Vec<InteractionResponse>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DashboardResponse {
    pub total_friends: usize,
    pub need_contact_today: Vec<FriendResponse>,
    pub need_contact_this_week: Vec<FriendResponse>,
    pub healthy_friendships: usize,
    pub at_risk_friendships: usize,
}

// ─── Requests ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
struct CreateFriendRequest {
    #[validate(length(min = 1, max = 255))]
    name: String,
    #[validate(length(max = 255))]
    nickname: Option<String>,
    #[serde(default)]
    relation_type: RelationKind,
    #[serde(default)]
    contact_frequency: ContactCadence,
    notes: Option<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
struct UpdateFriendRequest {
    #[validate(length(min = 1, max = 255))]
    name: Option<String>,
    #[validate(length(max = 255))]
    nickname: Option<String>,
    relation_type: Option<RelationKind>,
    contact_frequency: Option<ContactCadence>,
    notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LogInteractionRequest {
    summary: Option<String>,
    next_topics: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct NeedingContactQuery {
    #[serde(default)]
    threshold: i64,
}

// ─── Handlers ────────────────────────────────────────────────

async fn owned_contact(state: &AppState, device: &DeviceId, id: &str) -> Result<Contact> {
    state
        .db
        .get_contact(device.as_str(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Friend not found".to_string()))
}

async fn list_friends(
    State(state): State<Arc<AppState>>,
    Extension(device): Extension<DeviceId>,
) -> Result<Json<Vec<FriendResponse>>> {
    let now = state.clock.now();
    let friends = state.contacts.list_with_health(device.as_str(), now).await?;
    Ok(Json(friends.into_iter().map(FriendResponse::from).collect()))
}

async fn create_friend(
    State(state): State<Arc<AppState>>,
    Extension(device): Extension<DeviceId>,
    Json(request): Json<CreateFriendRequest>,
) -> Result<(StatusCode, Json<FriendResponse>)> {
    request.validate()?;

    let now = state.clock.now();
    let contact = Contact {
        id: generate_id()?,
        device_id: device.0,
        name: request.name,
        nickname: request.nickname,
        relation: request.relation_type,
        cadence: request.contact_frequency,
        notes: request.notes,
        created_at: now,
        updated_at: now,
    };
    state.db.insert_contact(&contact).await?;

    tracing::info!(
        device_id = %contact.device_id,
        contact_id = %contact.id,
        cadence = ?contact.cadence,
        "Friend created"
    );

    let entry = state.contacts.with_health(contact, now).await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(device): Extension<DeviceId>,
) -> Result<Json<DashboardResponse>> {
    let now = state.clock.now();
    let friends = state.contacts.list_with_health(device.as_str(), now).await?;
    let total_friends = friends.len();

    let mut red = Vec::new();
    let mut yellow = Vec::new();
    let mut healthy_friendships = 0;
    for entry in friends {
        match entry.health.status {
            HealthStatus::Red => red.push(entry),
            HealthStatus::Yellow => yellow.push(entry),
            HealthStatus::Green => healthy_friendships += 1,
            HealthStatus::Unknown => {}
        }
    }
    let at_risk_friendships = red.len() + yellow.len();

    let first = |list: Vec<ContactHealth>| -> Vec<FriendResponse> {
        list.into_iter()
            .take(DASHBOARD_LIST_LEN)
            .map(FriendResponse::from)
            .collect()
    };

    Ok(Json(DashboardResponse {
        total_friends,
        need_contact_today: first(red),
        need_contact_this_week: first(yellow),
        healthy_friendships,
        at_risk_friendships,
    }))
}

async fn get_needing_contact(
    State(state): State<Arc<AppState>>,
    Extension(device): Extension<DeviceId>,
    Query(query): Query<NeedingContactQuery>,
) -> Result<Json<Vec<FriendResponse>>> {
    let now = state.clock.now();
    let friends = state.contacts.list_with_health(device.as_str(), now).await?;
    let selected = select_needing_contact(friends, query.threshold);
    Ok(Json(selected.into_iter().map(FriendResponse::from).collect()))
}

async fn get_friend(
    State(state): State<Arc<AppState>>,
    Extension(device): Extension<DeviceId>,
    Path(id): Path<String>,
) -> Result<Json<FriendDetailResponse>> {
    let contact = owned_contact(&state, &device, &id).await?;
    let interactions = state.db.list_interactions(&id, DETAIL_INTERACTIONS).await?;

    let last = interactions.first().map(|i| i.contacted_at);
    let entry = ContactHealth::evaluate(contact, last, state.clock.now());

    Ok(Json(FriendDetailResponse {
        friend: entry.into(),
        interactions: interactions
            .into_iter()
            .map(InteractionResponse::from)
            .collect(),
    }))
}

async fn update_friend(
    State(state): State<Arc<AppState>>,
    Extension(device): Extension<DeviceId>,
    Path(id): Path<String>,
    Json(request): Json<UpdateFriendRequest>,
) -> Result<Json<FriendResponse>> {
    request.validate()?;

    let mut contact = owned_contact(&state, &device, &id).await?;
    if let Some(name) = request.name {
        contact.name = name;
    }
    if let Some(nickname) = request.nickname {
        contact.nickname = Some(nickname);
    }
    if let Some(relation) = request.relation_type {
        contact.relation = relation;
    }
    if let Some(cadence) = request.contact_frequency {
        contact.cadence = cadence;
    }
    if let Some(notes) = request.notes {
        contact.notes = Some(notes);
    }

    let now = state.clock.now();
    contact.updated_at = now;
    state.db.update_contact(&contact).await?;

    let entry = state.contacts.with_health(contact, now).await?;
    Ok(Json(entry.into()))
}

async fn delete_friend(
    State(state): State<Arc<AppState>>,
    Extension(device): Extension<DeviceId>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.db.delete_contact(device.as_str(), &id).await? {
        return Err(AppError::NotFound("Friend not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn log_interaction(
    State(state): State<Arc<AppState>>,
    Extension(device): Extension<DeviceId>,
    Path(id): Path<String>,
    Json(request): Json<LogInteractionRequest>,
) -> Result<(StatusCode, Json<InteractionResponse>)> {
    let contact = owned_contact(&state, &device, &id).await?;

    let now = state.clock.now();
    let interaction = Interaction {
        id: generate_id()?,
        contact_id: contact.id,
        device_id: contact.device_id,
        contacted_at: now,
        summary: request.summary,
        next_topics: request.next_topics.filter(|topics| !topics.is_empty()),
        created_at: now,
    };
    state.db.insert_interaction(&interaction).await?;

    tracing::info!(
        device_id = %interaction.device_id,
        contact_id = %interaction.contact_id,
        "Interaction logged"
    );

    Ok((StatusCode::CREATED, Json(interaction.into())))
}
