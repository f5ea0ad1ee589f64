use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Pre-rendered notification block of an inbound push.
///
/// When present the platform displays it on its own before any surface runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Data block of an inbound push. Everything besides `title`/`body` is passed
/// through to the rendered notification untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The single event shape every delivery surface consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PushData>,
}

impl PushPayload {
    /// Data-only payload, the shape surfaces render themselves.
    pub fn data_only(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            notification: None,
            data: Some(PushData {
                title: Some(title.into()),
                body: Some(body.into()),
                extra: Map::new(),
            }),
        }
    }

    /// True when the platform is expected to auto-display this payload.
    pub fn is_platform_displayed(&self) -> bool {
        self.notification.is_some()
    }

    /// The `data` block as a JSON object, `{}` when absent.
    pub fn data_value(&self) -> Value {
        let Some(data) = &self.data else {
            return Value::Object(Map::new());
        };

        let mut object = data.extra.clone();
        if let Some(title) = &data.title {
            object.insert("title".to_string(), Value::String(title.clone()));
        }
        if let Some(body) = &data.body {
            object.insert("body".to_string(), Value::String(body.clone()));
        }
        Value::Object(object)
    }
}

/// Options half of the outbound "show notification" platform call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub require_interaction: bool,
    pub renotify: bool,
    pub data: Value,
}

/// Outbound "show notification" request handed to a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowNotificationRequest {
    pub title: String,
    pub options: NotificationOptions,
}

/// Page visibility as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Kind of execution context a surface runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    Worker,
    Page,
}

/// Runtime state of a delivery surface, used by the visibility/focus gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SurfaceContext {
    /// Background worker. `focused_client` is set when the host knows a page
    /// client is visible and focused.
    Worker { focused_client: bool },
    Page {
        visibility: Visibility,
        has_focus: bool,
    },
}

impl SurfaceContext {
    pub fn worker() -> Self {
        SurfaceContext::Worker {
            focused_client: false,
        }
    }

    pub fn focused_page() -> Self {
        SurfaceContext::Page {
            visibility: Visibility::Visible,
            has_focus: true,
        }
    }

    pub fn hidden_page() -> Self {
        SurfaceContext::Page {
            visibility: Visibility::Hidden,
            has_focus: false,
        }
    }

    pub fn kind(&self) -> SurfaceKind {
        match self {
            SurfaceContext::Worker { .. } => SurfaceKind::Worker,
            SurfaceContext::Page { .. } => SurfaceKind::Page,
        }
    }
}

/// Cross-surface broadcast message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SurfaceMessage {
    #[serde(rename = "notification-shown")]
    NotificationShown { tag: String },
}

/// Whether the host can render notifications at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderCapability {
    Supported,
    Unsupported,
    PermissionDenied,
}

/// A notification the platform currently displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveNotification {
    pub tag: String,
    pub shown_at: DateTime<Utc>,
}

/// Why a surface dropped an event without rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionReason {
    /// Payload carried a `notification` block the platform shows itself.
    PlatformDisplayed,
    /// The visibility/focus gate handed the event to another surface.
    Deferred,
    /// Notifications unsupported or permission not granted.
    CapabilityAbsent,
    /// Another surface already claimed the tag inside the window.
    AlreadyClaimed,
    /// The claim succeeded but the render call failed.
    RenderFailed,
}

/// Terminal state of one event on one surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Rendered { tag: String },
    Suppressed { reason: SuppressionReason },
}

impl DeliveryOutcome {
    pub fn suppressed(reason: SuppressionReason) -> Self {
        DeliveryOutcome::Suppressed { reason }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, DeliveryOutcome::Rendered { .. })
    }
}

impl std::fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceKind::Worker => write!(f, "worker"),
            SurfaceKind::Page => write!(f, "page"),
        }
    }
}

impl std::fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuppressionReason::PlatformDisplayed => write!(f, "platform_displayed"),
            SuppressionReason::Deferred => write!(f, "deferred"),
            SuppressionReason::CapabilityAbsent => write!(f, "capability_absent"),
            SuppressionReason::AlreadyClaimed => write!(f, "already_claimed"),
            SuppressionReason::RenderFailed => write!(f, "render_failed"),
        }
    }
}
