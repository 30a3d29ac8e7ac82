// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Friend Keeper API Server
//!
//! Helps people keep in touch with friends and family: contact health,
//! AI conversation starters and token purchases.

use friend_keeper::{
    config::{Config, StorageBackend},
    db::{FirestoreDb, MemoryDb, Storage},
    time_utils::SystemClock,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.storage_backend,
        free_trial_count = config.free_trial_count,
        "Starting Friend Keeper API"
    );

    let db: Arc<dyn Storage> = match config.storage_backend {
        StorageBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    if config.llm_proxy_key.is_empty() {
        tracing::warn!("LLM_PROXY_KEY not set, talk starters will use defaults");
    }
    if config.creem_api_key.is_empty() {
        tracing::warn!("CREEM_API_KEY not set, checkout is disabled");
    }
    if config.creem_webhook_secret.is_empty() {
        tracing::warn!("CREEM_WEBHOOK_SECRET not set, webhook signatures are not verified");
    }

    // Build shared state
    let port = config.port;
    let state = Arc::new(AppState::new(config, db, Arc::new(SystemClock))?);

    // Build router
    let app = friend_keeper::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,friend_keeper=debug"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
