//! Push transport seam and fan-out.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinSet;

use peppermint_common::error::AppError;

use crate::compose::PushContent;

/// Device tokens are secrets; logs only show this many leading characters.
const TOKEN_LOG_PREFIX: usize = 20;

/// Delivers one push to one device token.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, token: &str, content: &PushContent) -> Result<(), AppError>;
}

/// Outcome of a fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub sent: usize,
    pub total: usize,
    /// Tokens the push service no longer recognises
    pub unregistered: Vec<String>,
}

enum SendOutcome {
    Sent,
    Unregistered(String),
    Failed,
}

/// Send `content` to every token concurrently.
///
/// Per-token failures are logged and counted, never returned. Tokens the push
/// service reports as unregistered come back in the report for cleanup.
pub async fn dispatch(
    transport: Arc<dyn PushTransport>,
    tokens: Vec<String>,
    content: PushContent,
) -> DispatchReport {
    let total = tokens.len();
    let content = Arc::new(content);
    let mut tasks = JoinSet::new();

    for token in tokens {
        let transport = transport.clone();
        let content = content.clone();
        tasks.spawn(async move {
            match transport.send(&token, &content).await {
                Ok(()) => {
                    tracing::debug!(token = %redact(&token), "Push sent");
                    SendOutcome::Sent
                }
                Err(AppError::TokenUnregistered(_)) => {
                    tracing::warn!(token = %redact(&token), "Device token unregistered");
                    SendOutcome::Unregistered(token)
                }
                Err(e) => {
                    tracing::error!(token = %redact(&token), error = %e, "Push failed");
                    SendOutcome::Failed
                }
            }
        });
    }

    let mut report = DispatchReport {
        total,
        ..Default::default()
    };
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(SendOutcome::Sent) => report.sent += 1,
            Ok(SendOutcome::Unregistered(token)) => report.unregistered.push(token),
            Ok(SendOutcome::Failed) => {}
            Err(e) => tracing::error!(error = %e, "Push task panicked"),
        }
    }

    tracing::info!(
        sent = report.sent,
        total,
        unregistered = report.unregistered.len(),
        title = %content.title,
        "Dispatch finished"
    );
    report
}

/// Shorten a device token for logging.
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(TOKEN_LOG_PREFIX).collect();
    format!("{}...", prefix)
}
