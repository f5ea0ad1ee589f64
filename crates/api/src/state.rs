//! Shared application state for the Axum API server.

use std::sync::Arc;

use peppermint_common::config::AppConfig;
use peppermint_notifier::transport::PushTransport;
use sqlx::PgPool;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub push: Arc<dyn PushTransport>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(pool: PgPool, push: Arc<dyn PushTransport>, config: AppConfig) -> Self {
        Self { pool, push, config }
    }
}
