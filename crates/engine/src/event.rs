use chrono::{DateTime, Utc};

use peppermint_common::config::DeliveryConfig;
use peppermint_common::types::{NotificationOptions, PushPayload, ShowNotificationRequest};

use crate::fingerprint::{Fingerprint, Tag, fingerprint};

/// The logical notification a device should see once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub title: String,
    pub body: String,
    pub arrival_time: DateTime<Utc>,
}

impl NotificationEvent {
    /// Build an event from the payload's `data` block.
    ///
    /// Missing or empty title/body fall back to the configured defaults.
    pub fn from_payload(
        payload: &PushPayload,
        arrival_time: DateTime<Utc>,
        config: &DeliveryConfig,
    ) -> Self {
        let data = payload.data.as_ref();
        let pick = |field: Option<&String>, default: &str| {
            field
                .filter(|s| !s.is_empty())
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            title: pick(data.and_then(|d| d.title.as_ref()), &config.default_title),
            body: pick(data.and_then(|d| d.body.as_ref()), &config.default_body),
            arrival_time,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.title, &self.body)
    }

    pub fn tag(&self, prefix: &str) -> Tag {
        Tag::new(prefix, self.fingerprint())
    }

    /// The outbound render request for this event.
    pub fn render_request(
        &self,
        tag: &Tag,
        payload: &PushPayload,
        config: &DeliveryConfig,
    ) -> ShowNotificationRequest {
        ShowNotificationRequest {
            title: self.title.clone(),
            options: NotificationOptions {
                body: self.body.clone(),
                icon: config.icon.clone(),
                badge: config.badge.clone(),
                tag: tag.as_str().to_string(),
                require_interaction: config.require_interaction,
                renotify: false,
                data: payload.data_value(),
            },
        }
    }
}
