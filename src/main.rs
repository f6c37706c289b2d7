use std::net::SocketAddr;
use std::sync::Arc;

use mongodb::Client;
use tracing_subscriber::EnvFilter;

use stockpulse::{
    config, routes,
    services::{
        bot_commands, cooldown::InMemoryCooldownLedger, db_init, market_data::AlphaVantageClient, repository::MongoRepository,
        scheduler, transport::BotClientRegistry,
    },
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load()?;

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri).await?;
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = db_init::ensure_indexes(&db).await {
        tracing::warn!(error = %e, "failed to ensure indexes");
    }

    let bots = BotClientRegistry::telegram(&settings.telegram_bot_token);
    if bots.has_default() {
        bot_commands::spawn_command_listener(settings.telegram_bot_token.trim().to_string());
    } else {
        tracing::warn!("TELEGRAM_BOT_TOKEN not configured, only per-user bots will be used");
    }

    let state = AppState::new(
        settings.clone(),
        Arc::new(MongoRepository::new(db)),
        Arc::new(AlphaVantageClient::new(settings.alpha_vantage_key.clone())),
        bots,
        Arc::new(InMemoryCooldownLedger::new()),
    )?;

    scheduler::spawn_notification_scheduler(state.clone());

    let app = routes::app(state);

    let addr = SocketAddr::from((settings.host.parse::<std::net::IpAddr>()?, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
