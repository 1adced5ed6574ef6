//! Notification service for push notifications.
//!
//! Match lifecycle transitions fan out best-effort pushes to group members.
//! Delivery failures are logged and never surface to the caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Notification type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewMatchRequest,
    MatchAccepted,
    MatchRejected,
    NewChatMessage,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::NewMatchRequest => write!(f, "new_match_request"),
            NotificationType::MatchAccepted => write!(f, "match_accepted"),
            NotificationType::MatchRejected => write!(f, "match_rejected"),
            NotificationType::NewChatMessage => write!(f, "new_chat_message"),
        }
    }
}

/// A lifecycle event worth telling users about.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchNotification {
    NewRequest {
        request_id: Uuid,
        sender_group_id: Uuid,
        sender_title: String,
    },
    Accepted {
        request_id: Uuid,
        receiver_title: String,
        channel_cid: String,
    },
    Rejected {
        request_id: Uuid,
        receiver_title: String,
    },
    NewChatMessage {
        channel_cid: String,
        preview: Option<String>,
    },
}

impl MatchNotification {
    pub fn notification_type(&self) -> NotificationType {
        match self {
            MatchNotification::NewRequest { .. } => NotificationType::NewMatchRequest,
            MatchNotification::Accepted { .. } => NotificationType::MatchAccepted,
            MatchNotification::Rejected { .. } => NotificationType::MatchRejected,
            MatchNotification::NewChatMessage { .. } => NotificationType::NewChatMessage,
        }
    }

    pub fn title(&self) -> String {
        match self {
            MatchNotification::NewRequest { .. } => "New match request".to_string(),
            MatchNotification::Accepted { .. } => "Match accepted".to_string(),
            MatchNotification::Rejected { .. } => "Match declined".to_string(),
            MatchNotification::NewChatMessage { .. } => "New message".to_string(),
        }
    }

    pub fn body(&self) -> String {
        match self {
            MatchNotification::NewRequest { sender_title, .. } => {
                format!("{} wants to meet your group", sender_title)
            }
            MatchNotification::Accepted { receiver_title, .. } => {
                format!("{} accepted your request. Say hello!", receiver_title)
            }
            MatchNotification::Rejected { receiver_title, .. } => {
                format!("{} passed on your request", receiver_title)
            }
            MatchNotification::NewChatMessage { preview, .. } => preview
                .as_deref()
                .map(|p| p.chars().take(100).collect())
                .unwrap_or_else(|| "You have a new message".to_string()),
        }
    }

    /// Key/value payload delivered alongside the visible notification.
    pub fn data(&self) -> HashMap<String, String> {
        let mut data = HashMap::new();
        data.insert("type".to_string(), self.notification_type().to_string());
        match self {
            MatchNotification::NewRequest {
                request_id,
                sender_group_id,
                ..
            } => {
                data.insert("request_id".to_string(), request_id.to_string());
                data.insert("sender_group_id".to_string(), sender_group_id.to_string());
            }
            MatchNotification::Accepted {
                request_id,
                channel_cid,
                ..
            } => {
                data.insert("request_id".to_string(), request_id.to_string());
                data.insert("channel_cid".to_string(), channel_cid.clone());
            }
            MatchNotification::Rejected { request_id, .. } => {
                data.insert("request_id".to_string(), request_id.to_string());
            }
            MatchNotification::NewChatMessage { channel_cid, .. } => {
                data.insert("channel_cid".to_string(), channel_cid.clone());
            }
        }
        data
    }
}

/// Errors raised by a push backend.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("Push provider request failed: {0}")]
    Request(String),

    #[error("Push provider not configured")]
    NotConfigured,
}

/// Per-call delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub delivered: usize,
    pub failed: usize,
}

/// Push provider seam.
#[async_trait::async_trait]
pub trait PushService: Send + Sync {
    async fn send_to_users(
        &self,
        title: &str,
        body: &str,
        user_ids: &[Uuid],
        data: &HashMap<String, String>,
    ) -> Result<DeliveryReceipt, PushError>;
}

/// A push captured by [`MockPushService`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentPush {
    pub title: String,
    pub body: String,
    pub user_ids: Vec<Uuid>,
    pub data: HashMap<String, String>,
}

impl SentPush {
    pub fn notification_type(&self) -> Option<&str> {
        self.data.get("type").map(String::as_str)
    }
}

/// Mock push service for development and testing.
///
/// Logs and records pushes but doesn't actually send them.
#[derive(Debug, Clone, Default)]
pub struct MockPushService {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    sent: Arc<Mutex<Vec<SentPush>>>,
}

impl MockPushService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock service that simulates failures.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentPush> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Pushes that reached `user_id`.
    pub fn sent_to(&self, user_id: Uuid) -> Vec<SentPush> {
        self.sent()
            .into_iter()
            .filter(|p| p.user_ids.contains(&user_id))
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait::async_trait]
impl PushService for MockPushService {
    async fn send_to_users(
        &self,
        title: &str,
        body: &str,
        user_ids: &[Uuid],
        data: &HashMap<String, String>,
    ) -> Result<DeliveryReceipt, PushError> {
        if self.simulate_failure {
            tracing::warn!(
                recipients = user_ids.len(),
                "Mock push service simulating failure"
            );
            return Err(PushError::Request("Simulated failure".to_string()));
        }

        tracing::info!(
            recipients = user_ids.len(),
            title = %title,
            "Mock: Would send push notification"
        );

        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentPush {
                title: title.to_string(),
                body: body.to_string(),
                user_ids: user_ids.to_vec(),
                data: data.clone(),
            });

        Ok(DeliveryReceipt {
            delivered: user_ids.len(),
            failed: 0,
        })
    }
}

/// Whether the dispatcher detaches deliveries from the calling task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Deliveries run on a spawned task; the caller returns immediately.
    Background,
    /// Deliveries are awaited in place. Used by tests for deterministic ordering.
    Inline,
}

/// Fire-and-forget fan-out of lifecycle notifications.
#[derive(Clone)]
pub struct NotificationDispatcher {
    push: Arc<dyn PushService>,
    mode: DispatchMode,
}

impl NotificationDispatcher {
    pub fn new(push: Arc<dyn PushService>, mode: DispatchMode) -> Self {
        Self { push, mode }
    }

    /// Sends `notification` to `recipients`. Never fails.
    pub async fn dispatch(&self, notification: MatchNotification, recipients: Vec<Uuid>) {
        if recipients.is_empty() {
            return;
        }
        match self.mode {
            DispatchMode::Background => {
                let push = self.push.clone();
                tokio::spawn(async move {
                    deliver(push.as_ref(), &notification, &recipients).await;
                });
            }
            DispatchMode::Inline => {
                deliver(self.push.as_ref(), &notification, &recipients).await;
            }
        }
    }
}

async fn deliver(push: &dyn PushService, notification: &MatchNotification, recipients: &[Uuid]) {
    let kind = notification.notification_type();
    match push
        .send_to_users(
            &notification.title(),
            &notification.body(),
            recipients,
            &notification.data(),
        )
        .await
    {
        Ok(receipt) => {
            tracing::debug!(
                notification_type = %kind,
                delivered = receipt.delivered,
                failed = receipt.failed,
                "Push dispatched"
            );
        }
        Err(e) => {
            tracing::warn!(
                notification_type = %kind,
                recipients = recipients.len(),
                error = %e,
                "Push delivery failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_display() {
        assert_eq!(
            NotificationType::NewMatchRequest.to_string(),
            "new_match_request"
        );
        assert_eq!(NotificationType::NewChatMessage.to_string(), "new_chat_message");
    }

    #[test]
    fn test_notification_data() {
        let request_id = Uuid::new_v4();
        let n = MatchNotification::Accepted {
            request_id,
            receiver_title: "Table 7".to_string(),
            channel_cid: "messaging:abc".to_string(),
        };
        let data = n.data();
        assert_eq!(data["type"], "match_accepted");
        assert_eq!(data["request_id"], request_id.to_string());
        assert_eq!(data["channel_cid"], "messaging:abc");
        assert!(n.body().contains("Table 7"));
    }

    #[test]
    fn test_chat_preview_truncated() {
        let n = MatchNotification::NewChatMessage {
            channel_cid: "messaging:abc".to_string(),
            preview: Some("x".repeat(300)),
        };
        assert_eq!(n.body().chars().count(), 100);

        let n = MatchNotification::NewChatMessage {
            channel_cid: "messaging:abc".to_string(),
            preview: None,
        };
        assert_eq!(n.body(), "You have a new message");
    }

    #[tokio::test]
    async fn test_inline_dispatch_records() {
        let push = MockPushService::new();
        let dispatcher = NotificationDispatcher::new(Arc::new(push.clone()), DispatchMode::Inline);
        let user = Uuid::new_v4();

        dispatcher
            .dispatch(
                MatchNotification::Rejected {
                    request_id: Uuid::new_v4(),
                    receiver_title: "t".to_string(),
                },
                vec![user],
            )
            .await;

        let sent = push.sent_to(user);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].notification_type(), Some("match_rejected"));
    }

    #[tokio::test]
    async fn test_dispatch_skips_empty_recipients() {
        let push = MockPushService::new();
        let dispatcher = NotificationDispatcher::new(Arc::new(push.clone()), DispatchMode::Inline);
        dispatcher
            .dispatch(
                MatchNotification::NewChatMessage {
                    channel_cid: "c".to_string(),
                    preview: None,
                },
                vec![],
            )
            .await;
        assert!(push.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let dispatcher =
            NotificationDispatcher::new(Arc::new(MockPushService::failing()), DispatchMode::Inline);
        dispatcher
            .dispatch(
                MatchNotification::Rejected {
                    request_id: Uuid::new_v4(),
                    receiver_title: "t".to_string(),
                },
                vec![Uuid::new_v4()],
            )
            .await;
    }
}
