//! Redis coordinator: one shared claim per tag with automatic expiry.
//!
//! For hosts whose surfaces can all reach the same Redis. Uses
//! `SET key 1 NX PX <window>` as an atomic check-and-set, so expiry is left to
//! the key TTL and `expire` has nothing to do.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::aio::ConnectionManager;

use peppermint_common::error::AppError;

use crate::coordinator::ClaimCoordinator;
use crate::fingerprint::Tag;

pub struct RedisCoordinator {
    redis: ConnectionManager,
    window_ms: u64,
}

impl RedisCoordinator {
    pub fn new(redis: ConnectionManager, window: Duration) -> Self {
        Self {
            redis,
            window_ms: Self::ttl_millis(window),
        }
    }

    fn claim_key(tag: &Tag) -> String {
        format!("notification:claim:{}", tag)
    }

    /// PX rejects zero, so sub-millisecond windows round up to 1ms.
    fn ttl_millis(window: Duration) -> u64 {
        window.num_milliseconds().max(1) as u64
    }
}

#[async_trait]
impl ClaimCoordinator for RedisCoordinator {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn try_claim(&self, tag: &Tag, _now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut conn = self.redis.clone();

        // Some("OK") if the key was set (not claimed yet), None if it exists
        let result: Option<String> = redis::cmd("SET")
            .arg(Self::claim_key(tag))
            .arg("1")
            .arg("NX")
            .arg("PX")
            .arg(self.window_ms)
            .query_async(&mut conn)
            .await?;

        let claimed = result.is_some();
        if !claimed {
            tracing::debug!(tag = %tag, window_ms = self.window_ms, "Tag already claimed in Redis");
        }

        Ok(claimed)
    }

    async fn expire(&self, _now: DateTime<Utc>) -> Result<usize, AppError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_key() {
        let tag = Tag::derive("peppermint", "Peppermint Tracker", "New update!");
        assert_eq!(
            RedisCoordinator::claim_key(&tag),
            "notification:claim:peppermint-djr1ks"
        );
    }

    #[test]
    fn test_ttl_millis() {
        assert_eq!(RedisCoordinator::ttl_millis(Duration::milliseconds(1000)), 1000);
        assert_eq!(RedisCoordinator::ttl_millis(Duration::zero()), 1);
    }

    /// Requires a running Redis at `REDIS_URL`.
    #[tokio::test]
    #[ignore]
    async fn test_claim_against_redis() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let conn = redis::Client::open(url)
            .unwrap()
            .get_connection_manager()
            .await
            .unwrap();
        let coordinator = RedisCoordinator::new(conn, Duration::milliseconds(300));
        let tag = Tag::derive("peppermint-test", "redis", &Utc::now().to_rfc3339());

        assert!(coordinator.try_claim(&tag, Utc::now()).await.unwrap());
        assert!(!coordinator.try_claim(&tag, Utc::now()).await.unwrap());

        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
        assert!(coordinator.try_claim(&tag, Utc::now()).await.unwrap());
    }
}
