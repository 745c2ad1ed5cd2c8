pub mod handlers;
pub mod routes;

use crate::accounts::AccountDirectory;
use crate::config::{ApiConfig, Config, WebhookConfig};
use crate::db::Database;
use crate::referral::ReferralService;
use crate::tasks::TaskLedger;
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state handed to every request handler. Each component is built
/// once at startup with its slice of the configuration.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub referral: Arc<ReferralService>,
    pub ledger: Arc<TaskLedger>,
    pub directory: Arc<AccountDirectory>,
    pub webhook: WebhookConfig,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: &Config) -> Self {
        Self {
            referral: Arc::new(ReferralService::new(db.clone(), config.referral.clone())),
            ledger: Arc::new(TaskLedger::new(db.clone(), config.tasks.clone())),
            directory: Arc::new(AccountDirectory::new(db.clone())),
            webhook: config.webhook.clone(),
            db,
        }
    }
}

/// Start the API server
pub async fn start_api_server(state: AppState, config: ApiConfig) -> Result<()> {
    // Set up CORS
    let cors = if config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    // Create router with all routes
    let app = Router::new()
        // General routes
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::get_metrics))

        // Account routes
        .route("/api/accounts/leaderboard", get(handlers::accounts::get_leaderboard))
        .route("/api/accounts/sync", post(handlers::accounts::sync_account))
        .route("/api/accounts/:id", get(handlers::accounts::get_account))

        // Referral routes
        .route("/api/referrals/code/:id", get(handlers::referrals::get_code))
        .route("/api/referrals/validate", get(handlers::referrals::validate_code))
        .route("/api/referrals/attribute", post(handlers::referrals::attribute))
        .route("/api/referrals/migrate-legacy", post(handlers::referrals::migrate_legacy))
        .route("/api/referrals/:id", get(handlers::referrals::list_referrals))
        .route("/api/referrals/:id/status", post(handlers::referrals::update_status))

        // Task routes
        .route("/api/tasks/assign", post(handlers::tasks::assign_tasks))
        .route("/api/tasks/complete", post(handlers::tasks::complete_task))
        .route("/api/tasks/:id", get(handlers::tasks::list_tasks))

        // Identity provider callbacks
        .route("/webhooks/identity", post(handlers::webhooks::identity_webhook))

        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Get bind address
    let addr = format!("{}:{}", config.host, config.port)
        .parse::<SocketAddr>()?;

    // Start server
    info!("Starting API server on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    } else {
        info!("Shutdown signal received, stopping API server");
    }
}
