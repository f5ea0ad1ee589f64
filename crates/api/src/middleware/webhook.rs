//! Shared-secret guard for the notify webhooks.
//!
//! When `WEBHOOK_SECRET` is configured, callers must send it in the
//! `X-Webhook-Secret` header. Without a configured secret the guard admits
//! every request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use subtle::ConstantTimeEq;

use peppermint_common::error::AppError;

use crate::state::AppState;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Marker extractor for routes that require the webhook secret.
#[derive(Debug, Clone, Copy)]
pub struct WebhookAuth;

/// Check a presented secret against the configured one.
pub fn verify_secret(expected: Option<&str>, presented: Option<&str>) -> Result<(), AppError> {
    match (expected, presented) {
        (None, _) => Ok(()),
        (Some(expected), Some(presented))
            if bool::from(expected.as_bytes().ct_eq(presented.as_bytes())) =>
        {
            Ok(())
        }
        (Some(_), Some(_)) => Err(AppError::Auth("Invalid webhook secret".to_string())),
        (Some(_), None) => Err(AppError::Auth(
            "Missing X-Webhook-Secret header".to_string(),
        )),
    }
}

impl FromRequestParts<AppState> for WebhookAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());

        verify_secret(state.config.webhook_secret.as_deref(), presented)?;
        Ok(WebhookAuth)
    }
}
