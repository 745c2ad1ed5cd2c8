use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rafiki_rewards::api;
use rafiki_rewards::config::Config;
use rafiki_rewards::db::init_database;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,rafiki_rewards=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration once; components receive their sections at
    // construction time
    let config = Config::from_env();
    info!("Loaded configuration");

    // Initialize database
    let db = Arc::new(init_database(&config.database).await?);
    info!("Connected to database");

    // Build shared service state and serve until shutdown
    let state = api::AppState::new(db, &config);
    api::start_api_server(state, config.api.clone()).await?;

    info!("Rafiki Rewards shutdown complete");
    Ok(())
}
