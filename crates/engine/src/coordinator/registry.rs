//! Registry coordinator: ask the platform what it is already showing.
//!
//! Instead of gossip, query the live-notification registry by tag right before
//! rendering. A same-tag notification shown inside the window suppresses the
//! claim. A local pending store covers the gap between a claim and the
//! platform registering the render. A notification created by another
//! surface after the query but before our render is not caught.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use peppermint_common::error::AppError;
use peppermint_common::types::LiveNotification;

use crate::coordinator::ClaimCoordinator;
use crate::fingerprint::Tag;
use crate::suppression::SuppressionStore;

/// Platform registry of currently displayed notifications.
#[async_trait]
pub trait NotificationRegistry: Send + Sync {
    /// Live notifications carrying `tag`.
    async fn live_notifications(&self, tag: &str) -> Result<Vec<LiveNotification>, AppError>;
}

pub struct RegistryCoordinator {
    registry: Arc<dyn NotificationRegistry>,
    window: Duration,
    pending: Mutex<SuppressionStore>,
}

impl RegistryCoordinator {
    pub fn new(registry: Arc<dyn NotificationRegistry>, window: Duration) -> Self {
        Self {
            registry,
            window,
            pending: Mutex::new(SuppressionStore::new(window)),
        }
    }
}

#[async_trait]
impl ClaimCoordinator for RegistryCoordinator {
    fn name(&self) -> &'static str {
        "registry"
    }

    async fn try_claim(&self, tag: &Tag, now: DateTime<Utc>) -> Result<bool, AppError> {
        let live = self.registry.live_notifications(tag.as_str()).await?;

        let recent = live.iter().any(|notification| {
            notification.tag == tag.as_str()
                && now.signed_duration_since(notification.shown_at) < self.window
        });
        if recent {
            tracing::debug!(tag = %tag, "Live notification with same tag already shown");
            return Ok(false);
        }

        Ok(self.pending.lock().await.try_claim(tag.fingerprint(), now))
    }

    async fn expire(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        Ok(self.pending.lock().await.expire(now))
    }
}
