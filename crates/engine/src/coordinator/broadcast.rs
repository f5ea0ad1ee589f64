//! Broadcast coordinator: replicated claims with gossip.
//!
//! Each surface lives in its own memory space and keeps a mirror of claimed
//! fingerprints. A successful claim is announced to every other surface on the
//! bus as `{"type":"notification-shown","tag":...}`. Pending announcements are
//! drained into the mirror before each claim, so there is no central
//! authority and no background task.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tokio::sync::broadcast::{self, error::TryRecvError};

use peppermint_common::error::AppError;
use peppermint_common::types::SurfaceMessage;

use crate::coordinator::ClaimCoordinator;
use crate::fingerprint::Tag;
use crate::suppression::SuppressionStore;

/// Default bus capacity; announcements beyond this are dropped for laggards.
const DEFAULT_BUS_CAPACITY: usize = 64;

/// Device-wide fire-and-forget channel between surfaces.
#[derive(Clone)]
pub struct BroadcastBus {
    tx: broadcast::Sender<SurfaceMessage>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Mirror-backed coordinator for a new surface on this bus.
    pub fn coordinator(&self, prefix: &str, window: Duration) -> BroadcastCoordinator {
        BroadcastCoordinator {
            prefix: prefix.to_string(),
            tx: self.tx.clone(),
            mirror: Mutex::new(Mirror {
                store: SuppressionStore::new(window),
                rx: self.tx.subscribe(),
            }),
        }
    }

    /// Publish a message to every live surface. No acknowledgement.
    pub fn publish(&self, message: SurfaceMessage) {
        if self.tx.send(message).is_err() {
            tracing::debug!("No surfaces subscribed to the broadcast bus");
        }
    }

    pub fn surface_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

struct Mirror {
    store: SuppressionStore,
    rx: broadcast::Receiver<SurfaceMessage>,
}

/// One surface's view of the device-wide claims.
pub struct BroadcastCoordinator {
    prefix: String,
    tx: broadcast::Sender<SurfaceMessage>,
    mirror: Mutex<Mirror>,
}

impl BroadcastCoordinator {
    /// Apply an announcement received over an external channel.
    pub async fn apply(&self, message: &SurfaceMessage, now: DateTime<Utc>) -> bool {
        let mut mirror = self.mirror.lock().await;
        Self::apply_to(&self.prefix, &mut mirror.store, message, now)
    }

    fn apply_to(
        prefix: &str,
        store: &mut SuppressionStore,
        message: &SurfaceMessage,
        now: DateTime<Utc>,
    ) -> bool {
        match message {
            SurfaceMessage::NotificationShown { tag } => match Tag::parse(prefix, tag) {
                Some(tag) => store.record(tag.fingerprint(), now),
                None => {
                    tracing::debug!(tag = %tag, "Ignoring announcement with foreign tag");
                    false
                }
            },
        }
    }

    /// Pull every pending announcement into the mirror.
    fn drain(prefix: &str, mirror: &mut Mirror, now: DateTime<Utc>) -> usize {
        let mut applied = 0;
        loop {
            match mirror.rx.try_recv() {
                Ok(message) => {
                    if Self::apply_to(prefix, &mut mirror.store, &message, now) {
                        applied += 1;
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Broadcast mirror lagged, announcements lost");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        applied
    }
}

#[async_trait]
impl ClaimCoordinator for BroadcastCoordinator {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    async fn try_claim(&self, tag: &Tag, now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut mirror = self.mirror.lock().await;
        Self::drain(&self.prefix, &mut mirror, now);

        if !mirror.store.try_claim(tag.fingerprint(), now) {
            return Ok(false);
        }

        let announcement = SurfaceMessage::NotificationShown {
            tag: tag.as_str().to_string(),
        };
        if self.tx.send(announcement).is_err() {
            tracing::debug!(tag = %tag, "Claim announced with no other surfaces listening");
        }

        Ok(true)
    }

    async fn expire(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let mut mirror = self.mirror.lock().await;
        Self::drain(&self.prefix, &mut mirror, now);
        Ok(mirror.store.expire(now))
    }
}
