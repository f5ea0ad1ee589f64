//! Health check endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Liveness plus the push settings surfaces depend on.
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "peppermint-api",
        "version": env!("CARGO_PKG_VERSION"),
        "pushMode": state.config.push_mode.to_string(),
        "webhookSecured": state.config.webhook_secret.is_some(),
    }))
}
