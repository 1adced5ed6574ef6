//! Match request coordinator.
//!
//! ```text
//!   submit()            accept()
//! ∅ ───────▶ WAITING ──────────▶ ACCEPTED ──▶ (inactive on exit/deletion)
//!              │ reject()
//!              ├────────▶ REJECTED
//!              │ cancel()
//!              └────────▶ CANCELED
//! ```
//!
//! Each transition runs in one store transaction holding the request row
//! lock. Pushes and provider cleanup only start after commit.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};
use crate::models::chat::ChannelHandle;
use crate::models::group::Group;
use crate::models::match_request::{ordered_pair, MatchRequest, MatchRequestList, MatchStatus};
use crate::models::point::PointReason;
use crate::services::chat_broker::ChatBroker;
use crate::services::groups::load_live_user;
use crate::services::ledger;
use crate::services::notification::{MatchNotification, NotificationDispatcher};
use crate::settings::{CoreSettings, FreePassPolicy};
use crate::store::{MeetupStore, StoreTx};

#[derive(Clone)]
pub struct MatchCoordinator<S: MeetupStore> {
    store: S,
    broker: ChatBroker<S>,
    notifier: NotificationDispatcher,
    settings: Arc<CoreSettings>,
}

/// Loads a group, distinguishing "missing" from "inactive".
async fn active_group<T: StoreTx>(tx: &mut T, group_id: Uuid) -> DomainResult<Group> {
    let group = tx
        .find_group(group_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Group", group_id))?;
    if !group.is_active {
        return Err(DomainError::GroupInactive(group_id));
    }
    Ok(group)
}

async fn lock_active_group<T: StoreTx>(tx: &mut T, group_id: Uuid) -> DomainResult<Group> {
    let group = tx
        .lock_group(group_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Group", group_id))?;
    if !group.is_active {
        return Err(DomainError::GroupInactive(group_id));
    }
    Ok(group)
}

/// Locks both groups in id order, so a concurrent disband either commits
/// first and is seen here or waits for this transaction.
async fn lock_active_pair<T: StoreTx>(
    tx: &mut T,
    sender_group_id: Uuid,
    receiver_group_id: Uuid,
) -> DomainResult<(Group, Group)> {
    let (low, high) = ordered_pair(sender_group_id, receiver_group_id);
    let low = lock_active_group(tx, low).await?;
    let high = lock_active_group(tx, high).await?;
    if low.id == sender_group_id {
        Ok((low, high))
    } else {
        Ok((high, low))
    }
}

async fn member_ids<T: StoreTx>(tx: &mut T, group_id: Uuid) -> DomainResult<Vec<Uuid>> {
    Ok(tx
        .list_active_members(group_id)
        .await?
        .into_iter()
        .map(|m| m.user_id)
        .collect())
}

impl<S: MeetupStore> MatchCoordinator<S> {
    pub fn new(
        store: S,
        broker: ChatBroker<S>,
        notifier: NotificationDispatcher,
        settings: Arc<CoreSettings>,
    ) -> Self {
        Self {
            store,
            broker,
            notifier,
            settings,
        }
    }

    /// Sends a match request from `sender_group_id` to `receiver_group_id`,
    /// debiting the receiver's match cost from the caller.
    pub async fn submit(
        &self,
        sender_group_id: Uuid,
        receiver_group_id: Uuid,
        caller: Uuid,
    ) -> DomainResult<MatchRequest> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let user = load_live_user(&mut tx, caller).await?;
        match tx.find_active_membership(caller).await? {
            Some(m) if m.group_id == sender_group_id => {}
            _ => {
                return Err(DomainError::NotGroupMember {
                    user_id: caller,
                    group_id: sender_group_id,
                })
            }
        }

        if sender_group_id == receiver_group_id {
            return Err(DomainError::SelfTarget);
        }

        let (sender, receiver) =
            lock_active_pair(&mut tx, sender_group_id, receiver_group_id).await?;

        tx.lock_pair(sender.id, receiver.id).await?;
        if tx
            .find_open_request_between(sender.id, receiver.id)
            .await?
            .is_some()
        {
            return Err(DomainError::DuplicateOpenRequest);
        }

        let exempt = self.settings.free_pass_policy == FreePassPolicy::Exempt
            && user.has_active_free_pass(now);
        let cost_paid = if exempt || receiver.match_cost == 0 {
            0
        } else {
            ledger::debit(
                &mut tx,
                caller,
                receiver.match_cost,
                PointReason::MatchRequest,
                now,
            )
            .await?;
            receiver.match_cost
        };

        let request = MatchRequest {
            id: Uuid::new_v4(),
            sender_group_id: sender.id,
            receiver_group_id: receiver.id,
            status: MatchStatus::Waiting,
            is_active: true,
            cost_paid,
            created_at: now,
            updated_at: now,
        };
        tx.insert_match_request(&request)
            .await
            .map_err(|e| duplicate_conflict(e.into()))?;

        let recipients = member_ids(&mut tx, receiver.id).await?;
        tx.commit()
            .await
            .map_err(|e| duplicate_conflict(e.into()))?;

        info!(
            request_id = %request.id,
            sender_group_id = %sender.id,
            receiver_group_id = %receiver.id,
            cost_paid,
            free_pass = exempt,
            "Match request submitted"
        );

        self.notifier
            .dispatch(
                MatchNotification::NewRequest {
                    request_id: request.id,
                    sender_group_id: sender.id,
                    sender_title: sender.title,
                },
                recipients,
            )
            .await;

        Ok(request)
    }

    /// Accepts a waiting request and opens the chat channel for both groups.
    ///
    /// Accepting an already accepted request returns the bound channel.
    pub async fn accept(&self, request_id: Uuid, caller: Uuid) -> DomainResult<ChannelHandle> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let request = self
            .lock_for_receiver(&mut tx, request_id, caller)
            .await?;
        if !request.is_active {
            return Err(DomainError::RequestInactive(request.id));
        }

        match request.status {
            MatchStatus::Accepted => {
                let bindings = tx.list_bindings_for_request(request.id).await?;
                return bindings.first().map(|b| b.handle()).ok_or_else(|| {
                    DomainError::Internal(format!(
                        "Accepted match request {} has no channel binding",
                        request.id
                    ))
                });
            }
            MatchStatus::Waiting => {}
            from => {
                return Err(DomainError::InvalidTransition {
                    from,
                    to: MatchStatus::Accepted,
                })
            }
        }

        let receiver = active_group(&mut tx, request.receiver_group_id).await?;
        active_group(&mut tx, request.sender_group_id).await?;

        tx.update_match_status(request.id, MatchStatus::Accepted, now)
            .await?;
        let handle = self
            .broker
            .open_channel(&mut tx, &request, caller, now)
            .await?;
        let recipients = member_ids(&mut tx, request.sender_group_id).await?;

        if let Err(e) = tx.commit().await {
            self.broker
                .discard_channel(&handle, "accept_commit_failed")
                .await;
            return Err(e.into());
        }

        info!(
            request_id = %request.id,
            channel_cid = %handle.channel_cid,
            "Match request accepted"
        );

        self.notifier
            .dispatch(
                MatchNotification::Accepted {
                    request_id: request.id,
                    receiver_title: receiver.title,
                    channel_cid: handle.channel_cid.clone(),
                },
                recipients,
            )
            .await;

        Ok(handle)
    }

    /// Declines a waiting request. Points are not refunded.
    pub async fn reject(&self, request_id: Uuid, caller: Uuid) -> DomainResult<()> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let request = self
            .lock_for_receiver(&mut tx, request_id, caller)
            .await?;
        if !self.begin_transition(&request, MatchStatus::Rejected)? {
            return Ok(());
        }

        tx.update_match_status(request.id, MatchStatus::Rejected, now)
            .await?;
        let receiver_title = tx
            .find_group(request.receiver_group_id)
            .await?
            .map(|g| g.title)
            .unwrap_or_default();
        let recipients = member_ids(&mut tx, request.sender_group_id).await?;
        tx.commit().await?;

        info!(request_id = %request.id, "Match request rejected");

        self.notifier
            .dispatch(
                MatchNotification::Rejected {
                    request_id: request.id,
                    receiver_title,
                },
                recipients,
            )
            .await;
        Ok(())
    }

    /// Withdraws a waiting request. Points are not refunded.
    pub async fn cancel(&self, request_id: Uuid, caller: Uuid) -> DomainResult<()> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let request = tx
            .lock_match_request(request_id)
            .await?
            .ok_or_else(|| DomainError::not_found("MatchRequest", request_id))?;
        match tx.find_active_membership(caller).await? {
            Some(m) if m.group_id == request.sender_group_id => {}
            _ => return Err(DomainError::NotSender(caller)),
        }
        if !self.begin_transition(&request, MatchStatus::Canceled)? {
            return Ok(());
        }

        tx.update_match_status(request.id, MatchStatus::Canceled, now)
            .await?;
        tx.commit().await?;

        info!(request_id = %request.id, "Match request canceled");
        Ok(())
    }

    /// Requests sent and received by the caller's group, excluding canceled
    /// ones, newest first.
    pub async fn list(&self, caller: Uuid) -> DomainResult<MatchRequestList> {
        let mut tx = self.store.begin().await?;
        let Some(membership) = tx.find_active_membership(caller).await? else {
            return Ok(MatchRequestList::default());
        };
        let sent = tx.list_sent_requests(membership.group_id).await?;
        let received = tx.list_received_requests(membership.group_id).await?;
        Ok(MatchRequestList { sent, received })
    }

    async fn lock_for_receiver(
        &self,
        tx: &mut S::Tx,
        request_id: Uuid,
        caller: Uuid,
    ) -> DomainResult<MatchRequest> {
        let request = tx
            .lock_match_request(request_id)
            .await?
            .ok_or_else(|| DomainError::not_found("MatchRequest", request_id))?;
        match tx.find_active_membership(caller).await? {
            Some(m) if m.group_id == request.receiver_group_id => Ok(request),
            _ => Err(DomainError::NotReceiver(caller)),
        }
    }

    /// Checks a WAITING -> `target` move. `Ok(false)` means the request is
    /// already in `target` and the call is a no-op.
    fn begin_transition(&self, request: &MatchRequest, target: MatchStatus) -> DomainResult<bool> {
        if request.status == target {
            return Ok(false);
        }
        if !request.status.can_transition_to(target) {
            return Err(DomainError::InvalidTransition {
                from: request.status,
                to: target,
            });
        }
        if !request.is_active {
            warn!(request_id = %request.id, "Transition attempted on inactive request");
            return Err(DomainError::RequestInactive(request.id));
        }
        Ok(true)
    }
}

/// The pair index caught a concurrent submit that passed the pre-check.
fn duplicate_conflict(e: DomainError) -> DomainError {
    if e.is_unique_violation() {
        DomainError::DuplicateOpenRequest
    } else {
        e
    }
}
