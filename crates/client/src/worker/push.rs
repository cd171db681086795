//! Push payloads and the notifications built from them.

use serde::{Deserialize, Serialize};
use url::Url;

/// Tag used when the payload does not carry one.
pub const DEFAULT_TAG: &str = "default";

/// JSON body delivered by the push transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PushPayload {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl PushPayload {
    /// Parse a raw push message. Absent or malformed payloads yield `None`.
    pub fn parse(data: Option<&[u8]>) -> Option<Self> {
        let data = data?;
        match serde_json::from_slice(data) {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::debug!("dropping malformed push payload ({} bytes): {}", data.len(), e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A notification ready for the host to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Repeats with the same tag replace each other.
    pub tag: String,
    /// URL opened by the `view` action.
    pub data: Option<String>,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    pub fn from_payload(payload: PushPayload, icon: &str, badge: &str) -> Self {
        Self {
            title: payload.title,
            body: payload.body,
            icon: icon.to_string(),
            badge: badge.to_string(),
            tag: payload.tag.unwrap_or_else(|| DEFAULT_TAG.to_string()),
            data: payload.url,
            actions: vec![
                NotificationAction { action: "view".into(), title: "View".into() },
                NotificationAction { action: "close".into(), title: "Close".into() },
            ],
        }
    }
}

/// What the host should do after a notification click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    OpenWindow { url: String },
    Dismiss,
}

/// Decide the click outcome. Only `view` with a resolvable URL opens a window.
pub fn click_outcome(origin: &Url, action: Option<&str>, notification: &Notification) -> ClickOutcome {
    let (Some("view"), Some(target)) = (action, notification.data.as_deref()) else {
        return ClickOutcome::Dismiss;
    };

    match origin.join(target) {
        Ok(url) => ClickOutcome::OpenWindow { url: url.to_string() },
        Err(e) => {
            tracing::warn!(url = target, error = %e, "notification url is not resolvable");
            ClickOutcome::Dismiss
        }
    }
}
