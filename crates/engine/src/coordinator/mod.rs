//! Claim coordinators: the one interface every surface consults before
//! rendering.
//!
//! Strategies differ only in how claims are shared between surfaces:
//! - [`LocalCoordinator`]: one store in shared memory
//! - [`broadcast::BroadcastCoordinator`]: per-surface mirrors plus gossip
//! - [`registry::RegistryCoordinator`]: platform live-notification query
//! - [`redis_claim::RedisCoordinator`]: shared Redis key with a TTL
//!
//! None of them is exactly-once. Two surfaces claiming inside the propagation
//! latency may both succeed; the shared tag still collapses them on platforms
//! with tag replacement.

pub mod broadcast;
pub mod redis_claim;
pub mod registry;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use peppermint_common::error::AppError;

use crate::fingerprint::Tag;
use crate::suppression::SuppressionStore;

/// Shared "already shown" bookkeeping for one device.
#[async_trait]
pub trait ClaimCoordinator: Send + Sync {
    /// Strategy name, for logs.
    fn name(&self) -> &'static str;

    /// Claim `tag` for rendering at `now`.
    ///
    /// Returns `true` if the caller may render, `false` if the tag is
    /// suppressed. A rejected claim leaves the coordinator state unchanged.
    async fn try_claim(&self, tag: &Tag, now: DateTime<Utc>) -> Result<bool, AppError>;

    /// Drop claims older than the suppression window. Returns how many were
    /// removed.
    async fn expire(&self, now: DateTime<Utc>) -> Result<usize, AppError>;
}

/// In-process coordinator over a single [`SuppressionStore`].
pub struct LocalCoordinator {
    store: Mutex<SuppressionStore>,
}

impl LocalCoordinator {
    pub fn new(window: Duration) -> Self {
        Self {
            store: Mutex::new(SuppressionStore::new(window)),
        }
    }

    /// Number of live and not-yet-expired records (for monitoring).
    pub async fn tracked_count(&self) -> usize {
        self.store.lock().await.len()
    }
}

#[async_trait]
impl ClaimCoordinator for LocalCoordinator {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn try_claim(&self, tag: &Tag, now: DateTime<Utc>) -> Result<bool, AppError> {
        Ok(self.store.lock().await.try_claim(tag.fingerprint(), now))
    }

    async fn expire(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        Ok(self.store.lock().await.expire(now))
    }
}
