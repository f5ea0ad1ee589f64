//! Notify webhooks, called by the database on new rows.
//!
//! Each composes a push from the inserted record and fans it out to the
//! registered device tokens.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use peppermint_common::error::AppError;
use peppermint_notifier::compose::{self, PushContent};
use peppermint_notifier::tokens::TokenService;
use peppermint_notifier::transport::{dispatch, redact};

use crate::middleware::webhook::WebhookAuth;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notify/chat-message", post(notify_chat_message))
        .route("/api/notify/photo-upload", post(notify_photo_upload))
        .route("/api/notify/test", post(notify_test))
}

/// Database webhook envelope: `{ "record": { ... } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload<T> {
    pub record: T,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRecord {
    pub name: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhotoRecord {
    pub uploader_name: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestPushParams {
    pub token: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub timestamp: Option<String>,
}

/// POST /api/notify/chat-message: Notify everyone but the sender.
async fn notify_chat_message(
    _auth: WebhookAuth,
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload<ChatRecord>>,
) -> Result<Json<Value>, AppError> {
    let record = payload.record;
    tracing::info!(sender = ?record.name, "New chat message");

    let tokens =
        TokenService::list_excluding_sender(&state.pool, record.name.as_deref()).await?;
    let content = compose::chat_message(record.name.as_deref(), record.message.as_deref());

    Ok(Json(fan_out(&state, tokens, content).await))
}

/// POST /api/notify/photo-upload: Notify everyone of a new sighting.
async fn notify_photo_upload(
    _auth: WebhookAuth,
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload<PhotoRecord>>,
) -> Result<Json<Value>, AppError> {
    let record = payload.record;
    tracing::info!(uploader = ?record.uploader_name, "New photo uploaded");

    let tokens = TokenService::list_all(&state.pool).await?;
    let content =
        compose::photo_upload(record.uploader_name.as_deref(), record.caption.as_deref());

    Ok(Json(fan_out(&state, tokens, content).await))
}

/// POST /api/notify/test: Send a single test push to one device.
async fn notify_test(
    _auth: WebhookAuth,
    State(state): State<AppState>,
    Json(params): Json<TestPushParams>,
) -> Result<Json<Value>, AppError> {
    let token = params
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("Token required".to_string()))?;

    let now = Utc::now();
    let content = compose::test_notification(
        params.title.as_deref(),
        params.body.as_deref(),
        params.timestamp.as_deref(),
        now,
    );

    tracing::info!(token = %redact(token), "Sending test notification");
    state.push.send(token, &content).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Notification sent successfully!",
        "sentAt": now.to_rfc3339(),
    })))
}

async fn fan_out(state: &AppState, tokens: Vec<String>, content: PushContent) -> Value {
    if tokens.is_empty() {
        tracing::info!("No device tokens to notify");
        return json!({ "message": "No tokens to notify" });
    }

    let report = dispatch(state.push.clone(), tokens, content).await;

    let mut removed = 0;
    for token in &report.unregistered {
        match TokenService::remove(&state.pool, token).await {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(token = %redact(token), error = %e, "Failed to remove stale token")
            }
        }
    }
    if removed > 0 {
        tracing::info!(removed, "Removed unregistered device tokens");
    }

    json!({
        "success": true,
        "sentCount": report.sent,
        "totalTokens": report.total,
        "removedTokens": removed,
    })
}
