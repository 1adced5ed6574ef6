//! Chat channel broker.
//!
//! Owns the local bindings between group members and provider channels, and
//! every call that creates or deletes a provider channel.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};
use crate::models::chat::{
    ChannelFilter, ChannelHandle, ChatChannelBinding, ChatEventType, ChatWebhookEvent,
    OrphanChannel,
};
use crate::models::group::GroupMember;
use crate::models::match_request::MatchRequest;
use crate::services::chat::ChatProvider;
use crate::services::notification::{MatchNotification, NotificationDispatcher};
use crate::settings::CoreSettings;
use crate::store::{MeetupStore, StoreTx};

const RECONCILE_BATCH: u32 = 100;
/// Upper bound on provider pages scanned in one reconciliation pass.
const RECONCILE_MAX_PAGES: u32 = 50;

/// What a webhook delivery led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum WebhookOutcome {
    Notified { recipients: usize },
    Ignored,
}

/// Result of one reconciler pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub recorded_resolved: usize,
    pub stale_deleted: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ChatBroker<S: MeetupStore> {
    store: S,
    chat: Arc<dyn ChatProvider>,
    notifier: NotificationDispatcher,
    settings: Arc<CoreSettings>,
}

impl<S: MeetupStore> ChatBroker<S> {
    pub fn new(
        store: S,
        chat: Arc<dyn ChatProvider>,
        notifier: NotificationDispatcher,
        settings: Arc<CoreSettings>,
    ) -> Self {
        Self {
            store,
            chat,
            notifier,
            settings,
        }
    }

    /// Creates the provider channel for an accepted request and binds every
    /// active member of both groups to it inside `tx`.
    ///
    /// The provider call happens while `tx` holds the request row lock.
    pub async fn open_channel(
        &self,
        tx: &mut S::Tx,
        request: &MatchRequest,
        creator: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<ChannelHandle> {
        let sender_members = tx.list_active_members(request.sender_group_id).await?;
        let receiver_members = tx.list_active_members(request.receiver_group_id).await?;
        if sender_members.is_empty() || receiver_members.is_empty() {
            return Err(DomainError::Internal(format!(
                "Match request {} has a group without active members",
                request.id
            )));
        }

        let member_ids: Vec<Uuid> = sender_members
            .iter()
            .chain(receiver_members.iter())
            .map(|m| m.user_id)
            .collect();

        let handle = self
            .chat
            .create_channel(&self.settings.chat_channel_type, &member_ids, creator)
            .await
            .map_err(|e| {
                warn!(request_id = %request.id, error = %e, "Chat channel creation failed");
                DomainError::ChatCreationFailed(e.to_string())
            })?;

        if let Err(e) = self
            .bind_members(tx, &handle, request, sender_members.iter().chain(&receiver_members), now)
            .await
        {
            // Nothing local references the channel; drop it right away and
            // leave stragglers to the reconciler's provider sweep.
            if let Err(delete_err) = self.chat.delete_channels(&[handle.channel_cid.clone()]).await {
                error!(
                    channel_cid = %handle.channel_cid,
                    error = %delete_err,
                    "Failed to delete channel after binding failure"
                );
            }
            return Err(e);
        }

        info!(
            request_id = %request.id,
            channel_cid = %handle.channel_cid,
            members = member_ids.len(),
            "Chat channel opened"
        );
        Ok(handle)
    }

    async fn bind_members<'a>(
        &self,
        tx: &mut S::Tx,
        handle: &ChannelHandle,
        request: &MatchRequest,
        members: impl Iterator<Item = &'a GroupMember>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        for member in members {
            let binding = ChatChannelBinding {
                id: Uuid::new_v4(),
                channel_id: handle.channel_id.clone(),
                channel_cid: handle.channel_cid.clone(),
                channel_type: handle.channel_type.clone(),
                match_request_id: request.id,
                group_id: member.group_id,
                group_member_id: member.id,
                user_id: member.user_id,
                is_active: true,
                created_at: now,
            };
            tx.insert_binding(&binding).await?;
        }
        Ok(())
    }

    /// Deletes a channel whose local commit failed, recording it as an orphan
    /// when the provider cannot be reached either.
    ///
    /// Must be called with no transaction open on this task.
    pub async fn discard_channel(&self, handle: &ChannelHandle, reason: &str) {
        let cids = vec![handle.channel_cid.clone()];
        if self.chat.delete_channels(&cids).await.is_ok() {
            info!(channel_cid = %handle.channel_cid, "Discarded uncommitted chat channel");
            return;
        }
        self.record_orphans(&cids, reason).await;
    }

    async fn record_orphans(&self, cids: &[String], reason: &str) {
        let result: DomainResult<()> = async {
            let mut tx = self.store.begin().await?;
            let now = Utc::now();
            for cid in cids {
                tx.insert_orphan_channel(&OrphanChannel {
                    id: Uuid::new_v4(),
                    channel_cid: cid.clone(),
                    reason: reason.to_string(),
                    recorded_at: now,
                    resolved_at: None,
                })
                .await?;
            }
            tx.commit().await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => warn!(count = cids.len(), reason = %reason, "Recorded orphaned chat channels"),
            Err(e) => error!(
                channel_cids = ?cids,
                error = %e,
                "Failed to record orphaned chat channels"
            ),
        }
    }

    /// Leaves a channel: deletes it at the provider, then deactivates every
    /// binding and the request that seeded it.
    pub async fn exit_channel(&self, channel_cid: &str, caller: Uuid) -> DomainResult<()> {
        {
            let mut tx = self.store.begin().await?;
            let bindings = tx.list_active_bindings_for_channel(channel_cid).await?;
            if !bindings.iter().any(|b| b.user_id == caller) {
                return Err(DomainError::NotChannelMember {
                    user_id: caller,
                    channel_cid: channel_cid.to_string(),
                });
            }
        }

        self.chat
            .delete_channels(&[channel_cid.to_string()])
            .await
            .map_err(|e| DomainError::Upstream(e.to_string()))?;

        let now = Utc::now();
        let requests = match self.deactivate_channel(channel_cid, now).await {
            Ok(requests) => requests,
            Err(e) => {
                error!(
                    channel_cid = %channel_cid,
                    error = %e,
                    "Chat channel deleted but local deactivation failed, retrying"
                );
                self.deactivate_channel(channel_cid, now).await?
            }
        };

        info!(
            channel_cid = %channel_cid,
            user_id = %caller,
            requests,
            "Chat channel exited"
        );
        Ok(())
    }

    /// Deactivates the channel's bindings and the requests that seeded them.
    async fn deactivate_channel(&self, channel_cid: &str, now: DateTime<Utc>) -> DomainResult<usize> {
        let mut tx = self.store.begin().await?;
        let bindings = tx.list_active_bindings_for_channel(channel_cid).await?;
        let request_ids: BTreeSet<Uuid> = bindings.iter().map(|b| b.match_request_id).collect();
        tx.deactivate_bindings_for_channel(channel_cid).await?;
        for request_id in &request_ids {
            tx.deactivate_match_request(*request_id, now).await?;
        }
        tx.commit().await?;
        Ok(request_ids.len())
    }

    /// Deactivates every channel the user is bound to inside `tx` and returns
    /// the distinct cids. Provider deletion is left to [`Self::delete_after_commit`].
    pub async fn detach_user_channels(
        &self,
        tx: &mut S::Tx,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<String>> {
        let bindings = tx.list_active_bindings_for_user(user_id).await?;
        let cids: BTreeSet<String> = bindings.iter().map(|b| b.channel_cid.clone()).collect();
        let request_ids: BTreeSet<Uuid> = bindings.iter().map(|b| b.match_request_id).collect();

        for cid in &cids {
            tx.deactivate_bindings_for_channel(cid).await?;
        }
        for request_id in request_ids {
            tx.deactivate_match_request(request_id, now).await?;
        }
        Ok(cids.into_iter().collect())
    }

    /// Deletes channels at the provider once their bindings are committed
    /// inactive. Failures are recorded for the reconciler, never returned.
    pub async fn delete_after_commit(&self, cids: &[String]) {
        if cids.is_empty() {
            return;
        }
        match self.chat.delete_channels(cids).await {
            Ok(()) => info!(count = cids.len(), "Chat channels deleted"),
            Err(e) => {
                warn!(count = cids.len(), error = %e, "Chat channel deletion failed");
                self.record_orphans(cids, "teardown_failed").await;
            }
        }
    }

    /// Tears down every channel the user participates in.
    pub async fn teardown_for_user(&self, user_id: Uuid) -> DomainResult<Vec<String>> {
        let mut tx = self.store.begin().await?;
        let cids = self.detach_user_channels(&mut tx, user_id, Utc::now()).await?;
        tx.commit().await?;
        self.delete_after_commit(&cids).await;
        Ok(cids)
    }

    /// Verifies and handles a provider webhook delivery.
    pub async fn handle_webhook(&self, body: &[u8], signature: &str) -> DomainResult<WebhookOutcome> {
        if !self.chat.verify_webhook_signature(body, signature) {
            return Err(DomainError::InvalidSignature);
        }

        let event: ChatWebhookEvent = serde_json::from_slice(body)
            .map_err(|e| DomainError::Validation(format!("Malformed webhook payload: {}", e)))?;

        if event.kind() != ChatEventType::MessageNew {
            return Ok(WebhookOutcome::Ignored);
        }
        let Some(cid) = event.cid.clone() else {
            return Ok(WebhookOutcome::Ignored);
        };

        let sender = event.sender_id();
        let recipients: Vec<Uuid> = {
            let mut tx = self.store.begin().await?;
            let bindings = tx.list_active_bindings_for_channel(&cid).await?;
            let users: BTreeSet<Uuid> = bindings
                .iter()
                .map(|b| b.user_id)
                .filter(|u| Some(*u) != sender)
                .collect();
            users.into_iter().collect()
        };

        let count = recipients.len();
        let preview = event.message.and_then(|m| m.text);
        self.notifier
            .dispatch(
                MatchNotification::NewChatMessage {
                    channel_cid: cid,
                    preview,
                },
                recipients,
            )
            .await;

        Ok(WebhookOutcome::Notified { recipients: count })
    }

    /// Deletes recorded orphans and provider channels with no active binding.
    pub async fn reconcile_orphans(&self, now: DateTime<Utc>) -> DomainResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        let orphans = {
            let mut tx = self.store.begin().await?;
            tx.list_unresolved_orphans(RECONCILE_BATCH as i64).await?
        };
        if !orphans.is_empty() {
            let cids: Vec<String> = orphans.iter().map(|o| o.channel_cid.clone()).collect();
            match self.chat.delete_channels(&cids).await {
                Ok(()) => {
                    let mut tx = self.store.begin().await?;
                    for orphan in &orphans {
                        tx.resolve_orphan(orphan.id, now).await?;
                    }
                    tx.commit().await?;
                    report.recorded_resolved = orphans.len();
                }
                Err(e) => {
                    warn!(count = orphans.len(), error = %e, "Orphan channel deletion failed");
                    report.failed += orphans.len();
                }
            }
        }

        let mut stale = Vec::new();
        let mut filter = ChannelFilter {
            channel_type: self.settings.chat_channel_type.clone(),
            created_before: now - self.settings.orphan_grace,
            limit: RECONCILE_BATCH,
            offset: 0,
        };
        for page in 0..RECONCILE_MAX_PAGES {
            let channels = self
                .chat
                .query_channels(&filter)
                .await
                .map_err(|e| DomainError::Upstream(e.to_string()))?;
            let fetched = channels.len() as u32;

            let mut tx = self.store.begin().await?;
            for channel in channels {
                if tx
                    .list_active_bindings_for_channel(&channel.channel_cid)
                    .await?
                    .is_empty()
                {
                    stale.push(channel.channel_cid);
                }
            }
            drop(tx);

            if fetched < RECONCILE_BATCH {
                break;
            }
            if page + 1 == RECONCILE_MAX_PAGES {
                warn!(pages = RECONCILE_MAX_PAGES, "Channel scan stopped at page limit");
            }
            filter.offset += fetched;
        }

        for batch in stale.chunks(RECONCILE_BATCH as usize) {
            match self.chat.delete_channels(batch).await {
                Ok(()) => report.stale_deleted += batch.len(),
                Err(e) => {
                    warn!(count = batch.len(), error = %e, "Stale channel deletion failed");
                    report.failed += batch.len();
                }
            }
        }

        if report != ReconcileReport::default() {
            info!(
                recorded_resolved = report.recorded_resolved,
                stale_deleted = report.stale_deleted,
                failed = report.failed,
                "Chat channel reconciliation finished"
            );
        }
        Ok(report)
    }
}
