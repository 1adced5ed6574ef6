//! Chat provider seam.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::chat::{ChannelFilter, ChannelHandle, ChannelSummary};

#[derive(Debug, Error)]
pub enum ChatClientError {
    #[error("Chat provider request failed: {0}")]
    Request(String),

    #[error("Chat provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Chat provider not configured")]
    NotConfigured,
}

/// Contract with the external real-time chat provider.
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    /// Creates a channel containing `members`, owned by `created_by`.
    async fn create_channel(
        &self,
        channel_type: &str,
        members: &[Uuid],
        created_by: Uuid,
    ) -> Result<ChannelHandle, ChatClientError>;

    /// Hard-deletes channels. Unknown cids are not an error.
    async fn delete_channels(&self, channel_cids: &[String]) -> Result<(), ChatClientError>;

    async fn query_channels(
        &self,
        filter: &ChannelFilter,
    ) -> Result<Vec<ChannelSummary>, ChatClientError>;

    /// Checks the provider's signature header against the raw request body.
    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool;
}

#[derive(Debug, Default)]
struct MockChatState {
    channels: Vec<ChannelSummary>,
    created: Vec<(ChannelHandle, Vec<Uuid>)>,
    deleted: Vec<String>,
}

/// Mock chat provider for development and testing.
///
/// Keeps channels in memory and signs webhooks with a shared secret.
#[derive(Debug, Clone)]
pub struct MockChatProvider {
    secret: String,
    /// Whether `create_channel` should fail.
    pub fail_create: bool,
    /// Whether `delete_channels` should fail.
    pub fail_delete: bool,
    state: Arc<Mutex<MockChatState>>,
}

impl MockChatProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            fail_create: false,
            fail_delete: false,
            state: Arc::new(Mutex::new(MockChatState::default())),
        }
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockChatState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Channels created so far with their member lists.
    pub fn created(&self) -> Vec<(ChannelHandle, Vec<Uuid>)> {
        self.state().created.clone()
    }

    /// Cids passed to `delete_channels`, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    /// Channels that currently exist on the mock provider.
    pub fn live_channels(&self) -> Vec<ChannelSummary> {
        self.state().channels.clone()
    }

    /// Registers a channel as if it had been created out of band.
    pub fn seed_channel(&self, summary: ChannelSummary) {
        self.state().channels.push(summary);
    }

    /// Signs `body` the way the provider would.
    pub fn sign(&self, body: &[u8]) -> String {
        shared::crypto::hmac_sha256_hex(&self.secret, body)
    }
}

#[async_trait::async_trait]
impl ChatProvider for MockChatProvider {
    async fn create_channel(
        &self,
        channel_type: &str,
        members: &[Uuid],
        created_by: Uuid,
    ) -> Result<ChannelHandle, ChatClientError> {
        if self.fail_create {
            tracing::warn!("Mock chat provider simulating create failure");
            return Err(ChatClientError::Request("Simulated failure".to_string()));
        }

        let channel_id = Uuid::new_v4().simple().to_string();
        let handle = ChannelHandle {
            channel_cid: format!("{}:{}", channel_type, channel_id),
            channel_id,
            channel_type: channel_type.to_string(),
        };
        tracing::info!(
            channel_cid = %handle.channel_cid,
            members = members.len(),
            created_by = %created_by,
            "Mock: Would create chat channel"
        );

        let mut state = self.state();
        state.channels.push(ChannelSummary {
            channel_id: handle.channel_id.clone(),
            channel_cid: handle.channel_cid.clone(),
            channel_type: handle.channel_type.clone(),
            created_at: Some(Utc::now()),
        });
        state.created.push((handle.clone(), members.to_vec()));
        Ok(handle)
    }

    async fn delete_channels(&self, channel_cids: &[String]) -> Result<(), ChatClientError> {
        if self.fail_delete {
            tracing::warn!("Mock chat provider simulating delete failure");
            return Err(ChatClientError::Request("Simulated failure".to_string()));
        }

        let mut state = self.state();
        state
            .channels
            .retain(|c| !channel_cids.contains(&c.channel_cid));
        state.deleted.extend(channel_cids.iter().cloned());
        Ok(())
    }

    async fn query_channels(
        &self,
        filter: &ChannelFilter,
    ) -> Result<Vec<ChannelSummary>, ChatClientError> {
        let state = self.state();
        Ok(state
            .channels
            .iter()
            .filter(|c| c.channel_type == filter.channel_type)
            .filter(|c| c.created_at.map_or(true, |at| at < filter.created_before))
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }

    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool {
        shared::crypto::verify_hmac_sha256_hex(&self.secret, body, signature)
    }
}
