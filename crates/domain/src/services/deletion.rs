//! Scheduled user deletion.
//!
//! Users ask to be deleted; after a grace period the worker closes their
//! group, invalidates their requests, tears down their chat channels and
//! marks them deleted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};
use crate::models::deletion::{
    DeletionReport, DeletionRunSummary, DeletionSchedule, DeletionStatus,
};
use crate::services::chat_broker::ChatBroker;
use crate::services::groups::{disband_in_tx, load_live_user};
use crate::settings::CoreSettings;
use crate::store::{MeetupStore, StoreTx};

#[derive(Clone)]
pub struct DeletionService<S: MeetupStore> {
    store: S,
    broker: ChatBroker<S>,
    settings: Arc<CoreSettings>,
}

impl<S: MeetupStore> DeletionService<S> {
    pub fn new(store: S, broker: ChatBroker<S>, settings: Arc<CoreSettings>) -> Self {
        Self {
            store,
            broker,
            settings,
        }
    }

    /// Schedules the caller for deletion once the grace period has passed.
    pub async fn schedule(&self, user_id: Uuid, reason: Option<String>) -> DomainResult<DeletionSchedule> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        load_live_user(&mut tx, user_id).await?;

        if tx.find_waiting_schedule(user_id).await?.is_some() {
            return Err(DomainError::DeletionAlreadyScheduled(user_id));
        }

        let schedule = DeletionSchedule {
            id: Uuid::new_v4(),
            user_id,
            reason,
            scheduled_at: now + self.settings.deletion_grace,
            status: DeletionStatus::Waiting,
            created_at: now,
            completed_at: None,
        };
        tx.insert_deletion_schedule(&schedule).await.map_err(|e| {
            let e = DomainError::from(e);
            if e.is_unique_violation() {
                DomainError::DeletionAlreadyScheduled(user_id)
            } else {
                e
            }
        })?;
        tx.commit().await?;

        info!(
            user_id = %user_id,
            scheduled_at = %schedule.scheduled_at,
            "User deletion scheduled"
        );
        Ok(schedule)
    }

    /// Withdraws a pending deletion.
    pub async fn cancel(&self, user_id: Uuid) -> DomainResult<DeletionSchedule> {
        let mut tx = self.store.begin().await?;
        let mut schedule = tx
            .find_waiting_schedule(user_id)
            .await?
            .ok_or(DomainError::NoPendingDeletion(user_id))?;
        tx.update_schedule_status(schedule.id, DeletionStatus::Canceled, None)
            .await?;
        tx.commit().await?;

        schedule.status = DeletionStatus::Canceled;
        info!(user_id = %user_id, "User deletion canceled");
        Ok(schedule)
    }

    /// Finalizes every schedule due before `now`.
    ///
    /// Each schedule commits on its own; one failure does not stop the batch.
    pub async fn run_due(&self, now: DateTime<Utc>) -> DomainResult<DeletionRunSummary> {
        let due = {
            let mut tx = self.store.begin().await?;
            tx.list_due_schedules(now, self.settings.deletion_batch_size)
                .await?
        };

        let mut summary = DeletionRunSummary::default();
        for schedule in due {
            match self.finalize(schedule.id, now).await {
                Ok(Some(report)) => {
                    self.broker.delete_after_commit(&report.channel_cids).await;
                    summary.completed.push(report);
                }
                Ok(None) => {}
                Err(e) => {
                    error!(
                        schedule_id = %schedule.id,
                        user_id = %schedule.user_id,
                        error = %e,
                        "Failed to finalize user deletion"
                    );
                    summary.failed += 1;
                }
            }
        }

        if !summary.completed.is_empty() || summary.failed > 0 {
            info!(
                completed = summary.completed.len(),
                failed = summary.failed,
                "Scheduled deletion pass finished"
            );
        }
        Ok(summary)
    }

    /// Local half of a deletion. `None` when another worker got there first.
    async fn finalize(&self, schedule_id: Uuid, now: DateTime<Utc>) -> DomainResult<Option<DeletionReport>> {
        let mut tx = self.store.begin().await?;
        let Some(schedule) = tx.lock_schedule(schedule_id).await? else {
            return Ok(None);
        };
        if !schedule.is_due(now) {
            return Ok(None);
        }

        let user_id = schedule.user_id;
        let mut report = DeletionReport {
            schedule_id,
            user_id,
            ..DeletionReport::default()
        };

        if let Some(membership) = tx.find_active_membership(user_id).await? {
            if let Some(group) = tx.lock_group(membership.group_id).await? {
                if membership.is_leader && group.is_active {
                    report.deactivated_requests += disband_in_tx(&mut tx, group.id, now).await?;
                    report.disbanded_group_id = Some(group.id);
                } else {
                    report.deactivated_requests +=
                        tx.deactivate_requests_for_group(group.id, now).await?;
                    tx.deactivate_member(membership.id, now).await?;
                    if group.is_active && tx.list_active_members(group.id).await?.is_empty() {
                        disband_in_tx(&mut tx, group.id, now).await?;
                        report.disbanded_group_id = Some(group.id);
                    }
                }
            }
        }

        report.channel_cids = self
            .broker
            .detach_user_channels(&mut tx, user_id, now)
            .await?;

        tx.deactivate_invitations_for_user(user_id).await?;
        tx.mark_user_deleted(user_id, now).await?;
        tx.update_schedule_status(schedule_id, DeletionStatus::Completed, Some(now))
            .await?;
        tx.commit().await?;

        info!(
            user_id = %user_id,
            disbanded_group_id = ?report.disbanded_group_id,
            deactivated_requests = report.deactivated_requests,
            channels = report.channel_cids.len(),
            "User deleted"
        );
        Ok(Some(report))
    }
}
