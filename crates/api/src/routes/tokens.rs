//! Device token registration.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use peppermint_common::error::AppError;
use peppermint_notifier::tokens::{DeviceToken, RegisterTokenParams, TokenService};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/tokens", post(register_token))
}

/// POST /api/tokens: Register (or refresh) a device's push token.
async fn register_token(
    State(state): State<AppState>,
    Json(params): Json<RegisterTokenParams>,
) -> Result<Json<DeviceToken>, AppError> {
    let record = TokenService::register(&state.pool, &params).await?;
    Ok(Json(record))
}
