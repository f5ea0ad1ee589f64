use std::str::FromStr;

use serde::Deserialize;

use crate::error::AppError;

/// How surfaces on one device share suppression claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatorStrategy {
    /// Single in-process store shared by every surface.
    Local,
    /// Per-surface mirrors kept in sync over a broadcast channel.
    Broadcast,
    /// Query the platform's live-notification registry by tag.
    Registry,
    /// Shared Redis key per tag with a TTL.
    Redis,
}

impl FromStr for CoordinatorStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(CoordinatorStrategy::Local),
            "broadcast" => Ok(CoordinatorStrategy::Broadcast),
            "registry" => Ok(CoordinatorStrategy::Registry),
            "redis" => Ok(CoordinatorStrategy::Redis),
            other => Err(AppError::Config(format!(
                "Unknown coordinator strategy '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for CoordinatorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinatorStrategy::Local => write!(f, "local"),
            CoordinatorStrategy::Broadcast => write!(f, "broadcast"),
            CoordinatorStrategy::Registry => write!(f, "registry"),
            CoordinatorStrategy::Redis => write!(f, "redis"),
        }
    }
}

/// Shape of outbound push messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PushMode {
    /// Only a `data` block; delivery surfaces render and de-duplicate.
    DataOnly,
    /// A `webpush.notification` block the browser displays by itself.
    Notification,
}

impl FromStr for PushMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "data-only" | "data_only" | "data" => Ok(PushMode::DataOnly),
            "notification" => Ok(PushMode::Notification),
            other => Err(AppError::Config(format!("Unknown push mode '{}'", other))),
        }
    }
}

impl std::fmt::Display for PushMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushMode::DataOnly => write!(f, "data-only"),
            PushMode::Notification => write!(f, "notification"),
        }
    }
}

/// Settings shared by every delivery surface on a device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Prefix of the platform tag (`<prefix>-<fingerprint>`)
    pub tag_prefix: String,

    /// How long a claimed fingerprint blocks identical content (default: 1000)
    pub suppression_window_ms: u64,

    /// Title used when an event carries none
    pub default_title: String,

    /// Body used when an event carries none
    pub default_body: String,

    pub icon: String,

    pub badge: String,

    pub require_interaction: bool,

    /// Claim sharing strategy (default: broadcast)
    pub strategy: CoordinatorStrategy,

    /// Redis connection string, required by the `redis` strategy
    pub redis_url: Option<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            tag_prefix: "peppermint".to_string(),
            suppression_window_ms: 1000,
            default_title: "Peppermint Tracker".to_string(),
            default_body: "New update!".to_string(),
            icon: "/icon-192.png".to_string(),
            badge: "/icon-96.png".to_string(),
            require_interaction: false,
            strategy: CoordinatorStrategy::Broadcast,
            redis_url: None,
        }
    }
}

impl DeliveryConfig {
    /// Load delivery settings from environment variables, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            tag_prefix: std::env::var("NOTIFICATION_TAG_PREFIX").unwrap_or(defaults.tag_prefix),
            suppression_window_ms: std::env::var("SUPPRESSION_WINDOW_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SUPPRESSION_WINDOW_MS must be a valid u64"))?,
            default_title: std::env::var("NOTIFICATION_DEFAULT_TITLE")
                .unwrap_or(defaults.default_title),
            default_body: std::env::var("NOTIFICATION_DEFAULT_BODY")
                .unwrap_or(defaults.default_body),
            icon: std::env::var("NOTIFICATION_ICON").unwrap_or(defaults.icon),
            badge: std::env::var("NOTIFICATION_BADGE").unwrap_or(defaults.badge),
            require_interaction: std::env::var("NOTIFICATION_REQUIRE_INTERACTION")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("NOTIFICATION_REQUIRE_INTERACTION must be true or false")
                })?,
            strategy: std::env::var("COORDINATOR_STRATEGY")
                .unwrap_or_else(|_| "broadcast".to_string())
                .parse()?,
            redis_url: std::env::var("REDIS_URL").ok(),
        })
    }

    /// The suppression window as a chrono duration.
    pub fn suppression_window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.suppression_window_ms as i64)
    }
}

/// Push-origin service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Port the API server listens on (default: 3000)
    pub api_port: u16,

    /// Firebase service-account JSON used to mint FCM access tokens
    pub firebase_service_account: String,

    /// Outbound message shape (default: data-only)
    pub push_mode: PushMode,

    /// Shared secret required on notify webhooks when set
    pub webhook_secret: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("API_PORT must be a valid u16"))?,
            firebase_service_account: std::env::var("FIREBASE_SERVICE_ACCOUNT").map_err(|_| {
                anyhow::anyhow!("FIREBASE_SERVICE_ACCOUNT environment variable is required")
            })?,
            push_mode: std::env::var("PUSH_MODE")
                .unwrap_or_else(|_| "data-only".to_string())
                .parse()?,
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
        })
    }
}
