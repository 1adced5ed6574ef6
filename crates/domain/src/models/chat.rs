//! Chat channel domain models.
//!
//! Channels live on the external chat provider; the local side only keeps
//! bindings for accounting and teardown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a channel created at the chat provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChannelHandle {
    pub channel_id: String,
    pub channel_cid: String,
    pub channel_type: String,
}

/// Links one group member to an external channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChatChannelBinding {
    pub id: Uuid,
    pub channel_id: String,
    pub channel_cid: String,
    pub channel_type: String,
    /// The request whose acceptance opened this channel.
    pub match_request_id: Uuid,
    pub group_id: Uuid,
    pub group_member_id: Uuid,
    pub user_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatChannelBinding {
    pub fn handle(&self) -> ChannelHandle {
        ChannelHandle {
            channel_id: self.channel_id.clone(),
            channel_cid: self.channel_cid.clone(),
            channel_type: self.channel_type.clone(),
        }
    }
}

/// A channel as reported by the provider's query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChannelSummary {
    pub channel_id: String,
    pub channel_cid: String,
    pub channel_type: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Filter for querying provider channels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ChannelFilter {
    pub channel_type: String,
    pub created_before: DateTime<Utc>,
    pub limit: u32,
    /// Number of matching channels to skip, oldest first.
    pub offset: u32,
}

/// A channel created at the provider whose local commit did not land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrphanChannel {
    pub id: Uuid,
    pub channel_cid: String,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Webhook event types the backend reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEventType {
    MessageNew,
    Other(String),
}

impl From<&str> for ChatEventType {
    fn from(s: &str) -> Self {
        match s {
            "message.new" => ChatEventType::MessageNew,
            other => ChatEventType::Other(other.to_string()),
        }
    }
}

/// Provider webhook payload (only the fields the backend reads).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub cid: Option<String>,
    #[serde(default)]
    pub user: Option<ChatEventUser>,
    #[serde(default)]
    pub message: Option<ChatEventMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatEventUser {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatEventMessage {
    #[serde(default)]
    pub text: Option<String>,
}

impl ChatWebhookEvent {
    pub fn kind(&self) -> ChatEventType {
        ChatEventType::from(self.event_type.as_str())
    }

    /// Sender user id, if the provider reported one we can parse.
    pub fn sender_id(&self) -> Option<Uuid> {
        self.user.as_ref().and_then(|u| Uuid::parse_str(&u.id).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_event_parsing() {
        let sender = Uuid::new_v4();
        let body = format!(
            r#"{{"type":"message.new","cid":"messaging:abc","user":{{"id":"{}"}},"message":{{"text":"hi","id":"m1"}},"watcher_count":2}}"#,
            sender
        );
        let event: ChatWebhookEvent = serde_json::from_str(&body).unwrap();
        assert_eq!(event.kind(), ChatEventType::MessageNew);
        assert_eq!(event.cid.as_deref(), Some("messaging:abc"));
        assert_eq!(event.sender_id(), Some(sender));
        assert_eq!(
            event.message.and_then(|m| m.text).as_deref(),
            Some("hi")
        );
    }

    #[test]
    fn test_webhook_event_other_type() {
        let event: ChatWebhookEvent =
            serde_json::from_str(r#"{"type":"channel.deleted","cid":"messaging:abc"}"#).unwrap();
        assert_eq!(
            event.kind(),
            ChatEventType::Other("channel.deleted".to_string())
        );
        assert_eq!(event.sender_id(), None);
    }

    #[test]
    fn test_binding_handle() {
        let binding = ChatChannelBinding {
            id: Uuid::new_v4(),
            channel_id: "abc".to_string(),
            channel_cid: "messaging:abc".to_string(),
            channel_type: "messaging".to_string(),
            match_request_id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            group_member_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            is_active: true,
            created_at: Utc::now(),
        };
        let handle = binding.handle();
        assert_eq!(handle.channel_cid, "messaging:abc");
        assert_eq!(handle.channel_type, "messaging");
    }
}
