//! Library entrypoint for StockPulse.
//!
//! The binary only wires configuration, MongoDB and the HTTP listener; the
//! notification engine, its entry points and the router live here so that
//! integration tests under `tests/` can build an `AppState` with in-memory
//! collaborators.

use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod error;
pub mod models;

#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;
pub mod views;

pub mod controllers;
pub mod routes;

use services::cooldown::CooldownStore;
use services::quote_source::{MarketData, QuoteSource};
use services::repository::NotificationRepository;
use services::transport::{BotClientRegistry, MessageTransport};
use views::messages::Messages;

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub repo: Arc<dyn NotificationRepository>,
    pub quotes: QuoteSource,
    pub transport: MessageTransport,
    pub cooldown: Arc<dyn CooldownStore>,
    pub messages: Messages,
}

impl AppState {
    pub fn new(
        settings: config::Settings,
        repo: Arc<dyn NotificationRepository>,
        market: Arc<dyn MarketData>,
        bots: BotClientRegistry,
        cooldown: Arc<dyn CooldownStore>,
    ) -> Result<Self, handlebars::TemplateError> {
        let timeout = settings.external_call_timeout();
        let spacing = Duration::from_millis(settings.market_data_min_interval_ms);

        Ok(Self {
            quotes: QuoteSource::new(market, timeout, spacing),
            transport: MessageTransport::new(Arc::new(bots), timeout),
            messages: Messages::build()?,
            settings,
            repo,
            cooldown,
        })
    }
}
