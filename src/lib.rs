// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Friend Keeper: relationship-maintenance backend
//!
//! This crate provides the backend API that tracks how recently a user has
//! been in touch with each contact, generates conversation starters, and
//! sells generation tokens through Creem.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Storage;
use error::AppError;
use services::{ContactService, CreemClient, PaymentService, StarterGenerator, TokenLedger};
use std::sync::Arc;
use time_utils::Clock;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Storage>,
    pub clock: Arc<dyn Clock>,
    pub contacts: ContactService,
    pub ledger: TokenLedger,
    pub generator: StarterGenerator,
    pub payments: PaymentService,
}

impl AppState {
    /// Wire up all services over one storage backend.
    pub fn new(
        config: Config,
        db: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let generator = StarterGenerator::new(
            config.llm_proxy_url.clone(),
            config.llm_proxy_key.clone(),
            config.llm_model.clone(),
        )?;

        let creem = CreemClient::new(config.creem_api_url.clone(), config.creem_api_key.clone())?;

        Ok(Self {
            contacts: ContactService::new(db.clone()),
            ledger: TokenLedger::new(db.clone(), config.free_trial_count),
            payments: PaymentService::new(db.clone(), creem, config.creem_product_ids.clone()),
            generator,
            db,
            clock,
            config,
        })
    }
}
