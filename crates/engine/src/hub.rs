//! Per-device surface factory.
//!
//! Owns the configured claim strategy and whatever it shares between surfaces
//! (a local store, a broadcast bus, the platform registry, a Redis connection)
//! and hands out surfaces wired to it.

use std::sync::Arc;

use redis::aio::ConnectionManager;

use peppermint_common::config::{CoordinatorStrategy, DeliveryConfig};
use peppermint_common::error::AppError;
use peppermint_common::redis_pool::connect_claim_store;
use peppermint_common::types::SurfaceContext;

use crate::coordinator::broadcast::BroadcastBus;
use crate::coordinator::redis_claim::RedisCoordinator;
use crate::coordinator::registry::{NotificationRegistry, RegistryCoordinator};
use crate::coordinator::{ClaimCoordinator, LocalCoordinator};
use crate::surface::{DeliverySurface, NotificationRenderer};

pub struct SurfaceHub {
    config: Arc<DeliveryConfig>,
    renderer: Arc<dyn NotificationRenderer>,
    local: Arc<LocalCoordinator>,
    bus: BroadcastBus,
    registry: Option<Arc<dyn NotificationRegistry>>,
    redis: Option<ConnectionManager>,
}

impl SurfaceHub {
    pub fn new(config: DeliveryConfig, renderer: Arc<dyn NotificationRenderer>) -> Self {
        let window = config.suppression_window();
        Self {
            config: Arc::new(config),
            renderer,
            local: Arc::new(LocalCoordinator::new(window)),
            bus: BroadcastBus::default(),
            registry: None,
            redis: None,
        }
    }

    /// Build a hub for `config`, connecting to the Redis claim store when the
    /// `redis` strategy is selected.
    pub async fn from_config(
        config: DeliveryConfig,
        renderer: Arc<dyn NotificationRenderer>,
    ) -> Result<Self, AppError> {
        let redis = match (config.strategy, config.redis_url.as_deref()) {
            (CoordinatorStrategy::Redis, Some(url)) => {
                let conn = connect_claim_store(url).await.map_err(|e| {
                    AppError::Config(format!("Failed to connect to REDIS_URL: {}", e))
                })?;
                Some(conn)
            }
            (CoordinatorStrategy::Redis, None) => {
                return Err(AppError::Config(
                    "redis strategy requires REDIS_URL".to_string(),
                ));
            }
            _ => None,
        };

        let hub = Self::new(config, renderer);
        Ok(match redis {
            Some(conn) => hub.with_redis(conn),
            None => hub,
        })
    }

    /// Hub configured from `NOTIFICATION_*`, `COORDINATOR_STRATEGY` and
    /// `REDIS_URL`.
    pub async fn from_env(renderer: Arc<dyn NotificationRenderer>) -> anyhow::Result<Self> {
        let config = DeliveryConfig::from_env()?;
        tracing::info!(
            strategy = %config.strategy,
            window_ms = config.suppression_window_ms,
            "Delivery settings loaded"
        );
        Ok(Self::from_config(config, renderer).await?)
    }

    /// Live-notification registry, required by the `registry` strategy.
    pub fn with_registry(mut self, registry: Arc<dyn NotificationRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Redis connection, required by the `redis` strategy.
    pub fn with_redis(mut self, redis: ConnectionManager) -> Self {
        self.redis = Some(redis);
        self
    }

    pub fn strategy(&self) -> CoordinatorStrategy {
        self.config.strategy
    }

    pub fn bus(&self) -> &BroadcastBus {
        &self.bus
    }

    /// The background worker surface.
    pub fn worker(&self, label: impl Into<String>) -> Result<DeliverySurface, AppError> {
        self.surface(label, SurfaceContext::worker())
    }

    /// A page surface in the given visibility/focus state.
    pub fn page(
        &self,
        label: impl Into<String>,
        context: SurfaceContext,
    ) -> Result<DeliverySurface, AppError> {
        self.surface(label, context)
    }

    pub fn surface(
        &self,
        label: impl Into<String>,
        context: SurfaceContext,
    ) -> Result<DeliverySurface, AppError> {
        let label = label.into();
        let coordinator = self.coordinator()?;

        tracing::debug!(
            surface = %label,
            kind = %context.kind(),
            strategy = %self.config.strategy,
            "Delivery surface created"
        );

        Ok(DeliverySurface::new(
            label,
            context,
            coordinator,
            self.renderer.clone(),
            self.config.clone(),
        ))
    }

    fn coordinator(&self) -> Result<Arc<dyn ClaimCoordinator>, AppError> {
        let window = self.config.suppression_window();

        let coordinator: Arc<dyn ClaimCoordinator> = match self.config.strategy {
            CoordinatorStrategy::Local => self.local.clone(),
            CoordinatorStrategy::Broadcast => {
                Arc::new(self.bus.coordinator(&self.config.tag_prefix, window))
            }
            CoordinatorStrategy::Registry => {
                let registry = self.registry.clone().ok_or_else(|| {
                    AppError::Config(
                        "registry strategy requires a notification registry".to_string(),
                    )
                })?;
                Arc::new(RegistryCoordinator::new(registry, window))
            }
            CoordinatorStrategy::Redis => {
                let redis = self.redis.clone().ok_or_else(|| {
                    AppError::Config("redis strategy requires a Redis connection".to_string())
                })?;
                Arc::new(RedisCoordinator::new(redis, window))
            }
        };

        Ok(coordinator)
    }
}
