//! sw_push and sw_notification_click tool implementations.

use harbor_client::{ClickOutcome, Notification, OfflineWorker, PushPayload, WorkerEvents};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Raw push message text, normally JSON `{title, body, tag?, url?}`.
    /// Omit to deliver a push without data.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Output from the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushOutput {
    pub shown: bool,
    pub notification: Option<Notification>,
}

/// Parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// Action button clicked ("view", "close"); omit for a click on the body.
    #[serde(default)]
    pub action: Option<String>,

    /// URL carried by the notification.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub title: String,
}

/// Implementation of the sw_push tool.
pub async fn push_impl(worker: &OfflineWorker, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let notification = worker.on_push(params.payload.as_deref().map(str::as_bytes));
    json_result(&SwPushOutput { shown: notification.is_some(), notification })
}

/// Implementation of the sw_notification_click tool.
pub async fn notification_click_impl(
    worker: &OfflineWorker, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let config = worker.config();
    let notification = Notification::from_payload(
        PushPayload { title: params.title, body: String::new(), tag: None, url: params.url },
        &config.notification_icon,
        &config.notification_badge,
    );
    let outcome: ClickOutcome = worker.on_notification_click(params.action.as_deref(), &notification);
    json_result(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{output, worker};

    #[tokio::test]
    async fn test_push_shows_notification() {
        let (_network, worker) = worker().await;
        let payload = r#"{"title":"Open house","body":"Saturday 2pm","tag":"events","url":"/properties/42"}"#;
        let params = SwPushParams { payload: Some(payload.into()) };

        let out: SwPushOutput = output(&push_impl(&worker, params).await.unwrap());
        assert!(out.shown);
        let notification = out.notification.unwrap();
        assert_eq!(notification.tag, "events");
        assert_eq!(notification.data.as_deref(), Some("/properties/42"));
        assert_eq!(notification.badge, "/icons/badge-72x72.png");
    }

    #[tokio::test]
    async fn test_push_drops_bad_payloads() {
        let (_network, worker) = worker().await;

        let out: SwPushOutput = output(&push_impl(&worker, SwPushParams { payload: None }).await.unwrap());
        assert!(!out.shown);

        let out: SwPushOutput =
            output(&push_impl(&worker, SwPushParams { payload: Some("<html>".into()) }).await.unwrap());
        assert!(!out.shown);
        assert!(out.notification.is_none());
    }

    #[tokio::test]
    async fn test_click_view_and_close() {
        let (_network, worker) = worker().await;

        let params =
            SwNotificationClickParams { action: Some("view".into()), url: Some("/journal".into()), title: "t".into() };
        let out: ClickOutcome = output(&notification_click_impl(&worker, params).await.unwrap());
        assert_eq!(out, ClickOutcome::OpenWindow { url: "https://maison.example/journal".into() });

        let params =
            SwNotificationClickParams { action: Some("close".into()), url: Some("/journal".into()), title: "t".into() };
        let out: ClickOutcome = output(&notification_click_impl(&worker, params).await.unwrap());
        assert_eq!(out, ClickOutcome::Dismiss);
    }
}
