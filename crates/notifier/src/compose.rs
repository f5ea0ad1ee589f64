//! Push message composition for app activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat bodies longer than this are cut and suffixed with `...`.
const MESSAGE_PREVIEW_CHARS: usize = 100;

/// Title/body/link of one outbound push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushContent {
    pub title: String,
    pub body: String,
    /// Path opened when the notification is clicked
    pub link: String,
}

/// A new chat message, sent to everyone except the sender.
pub fn chat_message(sender: Option<&str>, message: Option<&str>) -> PushContent {
    let sender = non_empty(sender).unwrap_or("Someone");
    let message = non_empty(message).unwrap_or("New message");

    PushContent {
        title: format!("{} sent a message", sender),
        body: preview(message),
        link: "/chat".to_string(),
    }
}

/// A new photo/video sighting.
pub fn photo_upload(uploader: Option<&str>, caption: Option<&str>) -> PushContent {
    let uploader = non_empty(uploader).unwrap_or("Someone");
    let caption = non_empty(caption).unwrap_or("Check out the latest Peppermint sighting!");

    PushContent {
        title: format!("New photo from {}!", uploader),
        body: caption.to_string(),
        link: "/".to_string(),
    }
}

/// Manual test push, used to verify a device end to end.
pub fn test_notification(
    title: Option<&str>,
    body: Option<&str>,
    timestamp: Option<&str>,
    now: DateTime<Utc>,
) -> PushContent {
    let title = non_empty(title).unwrap_or("🧪 Test Notification");
    let body = match non_empty(body) {
        Some(body) => body.to_string(),
        None => {
            let sent_at = non_empty(timestamp)
                .map(str::to_string)
                .unwrap_or_else(|| now.format("%H:%M:%S").to_string());
            format!("Test sent at {}", sent_at)
        }
    };

    PushContent {
        title: title.to_string(),
        body,
        link: "/fcm-test".to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn preview(message: &str) -> String {
    if message.chars().count() <= MESSAGE_PREVIEW_CHARS {
        return message.to_string();
    }
    let mut cut: String = message.chars().take(MESSAGE_PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}
