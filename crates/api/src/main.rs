//! Peppermint Tracker push API binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use peppermint_common::config::AppConfig;
use peppermint_common::db::create_pool;
use peppermint_notifier::fcm::{FcmClient, ServiceAccount};

use peppermint_api::routes::create_router;
use peppermint_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "peppermint_api=debug,peppermint_notifier=debug,tower_http=debug",
            )
        }))
        .init();

    tracing::info!("Starting Peppermint Tracker API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;

    // Run migrations
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    // Push transport
    let account = ServiceAccount::from_json(&config.firebase_service_account)?;
    tracing::info!(
        project_id = %account.project_id,
        push_mode = ?config.push_mode,
        "FCM transport configured"
    );
    let push = Arc::new(FcmClient::new(account, config.push_mode)?);

    let port = config.api_port;
    let state = AppState::new(pool, push, config);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    tracing::info!("Peppermint Tracker API server stopped.");
    Ok(())
}
