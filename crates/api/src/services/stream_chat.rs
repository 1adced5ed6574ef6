//! Stream Chat server-side client.
//!
//! Implements the ChatProvider trait against the Stream Chat REST API using a
//! server token signed with the application secret.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use domain::models::chat::{ChannelFilter, ChannelHandle, ChannelSummary};
use domain::services::{ChatClientError, ChatProvider};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::config::ChatConfig;

/// Transport failures and 5xx responses are retried this many times.
const MAX_RETRIES: u32 = 2;

/// Stream Chat client holding a pre-signed server token.
pub struct StreamChatClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    server_token: String,
}

#[derive(Debug, Serialize)]
struct ServerClaims {
    server: bool,
}

#[derive(Debug, Deserialize)]
struct ChannelEnvelope {
    channel: ChannelData,
}

#[derive(Debug, Deserialize)]
struct ChannelData {
    id: String,
    cid: String,
    #[serde(rename = "type")]
    channel_type: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct QueryChannelsResponse {
    #[serde(default)]
    channels: Vec<ChannelEnvelope>,
}

#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    #[serde(default)]
    message: String,
}

impl From<ChannelData> for ChannelSummary {
    fn from(c: ChannelData) -> Self {
        ChannelSummary {
            channel_id: c.id,
            channel_cid: c.cid,
            channel_type: c.channel_type,
            created_at: c.created_at,
        }
    }
}

impl StreamChatClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns `NotConfigured` when the key or secret is empty.
    pub fn new(config: &ChatConfig) -> Result<Self, ChatClientError> {
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(ChatClientError::NotConfigured);
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ChatClientError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            server_token: server_token(&config.api_secret)?,
            api_secret: config.api_secret.clone(),
        })
    }

    /// POSTs `body` to `path`, retrying transport errors and 5xx responses.
    ///
    /// Only used for requests that are safe to repeat.
    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, ChatClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(100 * (1 << (attempt - 1)))).await;
            }

            let response = self
                .client
                .post(&url)
                .query(&[("api_key", self.api_key.as_str())])
                .header("Authorization", &self.server_token)
                .header("stream-auth-type", "jwt")
                .json(body)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) if resp.status().is_server_error() => {
                    last_error = Some(api_error(resp).await);
                }
                Ok(resp) => return Err(api_error(resp).await),
                Err(e) => {
                    last_error = Some(ChatClientError::Request(e.to_string()));
                }
            }
            tracing::debug!(path = %path, attempt = attempt, "Retrying chat provider call");
        }

        Err(last_error.unwrap_or_else(|| ChatClientError::Request("Unknown error".to_string())))
    }

    /// Registers the members so the provider accepts them on a channel.
    async fn upsert_users(&self, members: &[Uuid]) -> Result<(), ChatClientError> {
        let users: serde_json::Map<String, serde_json::Value> = members
            .iter()
            .map(|id| (id.to_string(), json!({ "id": id.to_string() })))
            .collect();
        self.post("/users", &json!({ "users": users })).await?;
        Ok(())
    }
}

/// HS256 token the provider accepts for server-side calls.
fn server_token(api_secret: &str) -> Result<String, ChatClientError> {
    let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256);
    jsonwebtoken::encode(
        &header,
        &ServerClaims { server: true },
        &jsonwebtoken::EncodingKey::from_secret(api_secret.as_bytes()),
    )
    .map_err(|e| ChatClientError::Request(format!("Failed to sign server token: {}", e)))
}

async fn api_error(resp: reqwest::Response) -> ChatClientError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<StreamErrorBody>(&text)
        .map(|b| b.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or(text);
    ChatClientError::Api {
        status: status.as_u16(),
        message,
    }
}

fn create_channel_body(members: &[Uuid], created_by: Uuid) -> serde_json::Value {
    let members: Vec<String> = members.iter().map(Uuid::to_string).collect();
    json!({
        "data": {
            "created_by_id": created_by.to_string(),
            "members": members,
        },
        "state": false,
        "watch": false,
    })
}

fn query_channels_body(filter: &ChannelFilter) -> serde_json::Value {
    json!({
        "filter_conditions": {
            "type": filter.channel_type,
            "created_at": {
                "$lt": filter.created_before.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        },
        "sort": [{ "field": "created_at", "direction": 1 }],
        "limit": filter.limit,
        "offset": filter.offset,
        "state": false,
        "watch": false,
    })
}

#[async_trait::async_trait]
impl ChatProvider for StreamChatClient {
    async fn create_channel(
        &self,
        channel_type: &str,
        members: &[Uuid],
        created_by: Uuid,
    ) -> Result<ChannelHandle, ChatClientError> {
        self.upsert_users(members).await?;

        // The id is chosen here, so a retried create returns the same channel.
        let channel_id = Uuid::new_v4().simple().to_string();
        let path = format!("/channels/{}/{}/query", channel_type, channel_id);
        let resp = self
            .post(&path, &create_channel_body(members, created_by))
            .await?;
        let envelope: ChannelEnvelope = resp
            .json()
            .await
            .map_err(|e| ChatClientError::Request(format!("Malformed channel response: {}", e)))?;

        tracing::info!(
            channel_cid = %envelope.channel.cid,
            members = members.len(),
            "Chat channel created"
        );

        Ok(ChannelHandle {
            channel_id: envelope.channel.id,
            channel_cid: envelope.channel.cid,
            channel_type: envelope.channel.channel_type,
        })
    }

    async fn delete_channels(&self, channel_cids: &[String]) -> Result<(), ChatClientError> {
        if channel_cids.is_empty() {
            return Ok(());
        }

        let body = json!({ "cids": channel_cids, "hard_delete": true });
        match self.post("/channels/delete", &body).await {
            Ok(_) => {
                tracing::info!(count = channel_cids.len(), "Chat channels deleted");
                Ok(())
            }
            Err(ChatClientError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn query_channels(
        &self,
        filter: &ChannelFilter,
    ) -> Result<Vec<ChannelSummary>, ChatClientError> {
        let resp = self.post("/channels", &query_channels_body(filter)).await?;
        let parsed: QueryChannelsResponse = resp
            .json()
            .await
            .map_err(|e| ChatClientError::Request(format!("Malformed query response: {}", e)))?;

        Ok(parsed
            .channels
            .into_iter()
            .map(|c| c.channel.into())
            .collect())
    }

    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool {
        shared::crypto::verify_hmac_sha256_hex(&self.api_secret, body, signature)
    }
}
