//! Postgres implementation of the domain store seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::chat::{ChatChannelBinding, OrphanChannel};
use domain::models::deletion::{DeletionSchedule, DeletionStatus};
use domain::models::group::{Group, GroupMember};
use domain::models::hotplace::{Hotplace, NewHotplace};
use domain::models::invitation::InvitationCode;
use domain::models::match_request::{MatchRequest, MatchStatus};
use domain::models::point::PointConsumption;
use domain::models::purchase::PurchaseRecord;
use domain::models::user::User;
use domain::{MeetupStore, StoreError, StoreTx};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::metrics::record_constraint_violation;
use crate::repositories::{
    ChatBindingRepository, DeletionRepository, GroupRepository, HotplaceRepository,
    InvitationRepository, MatchRequestRepository, PointRepository, PurchaseRepository,
    UserRepository,
};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Translates driver errors into the store taxonomy.
pub fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        let constraint = db.constraint().unwrap_or("unknown").to_string();
        match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                record_constraint_violation("unique", &constraint);
                return StoreError::UniqueViolation(constraint);
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                record_constraint_violation("foreign_key", &constraint);
                return StoreError::ForeignKeyViolation(constraint);
            }
            _ => {}
        }
    }
    StoreError::Database(err.to_string())
}

/// Store backed by a Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MeetupStore for PgStore {
    type Tx = PgStoreTx;

    async fn begin(&self) -> Result<PgStoreTx, StoreError> {
        let tx = self.pool.begin().await.map_err(map_db_error)?;
        Ok(PgStoreTx { tx })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }
}

/// An open Postgres transaction. Dropping it rolls back.
pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_db_error)
    }

    // Users

    async fn find_user(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        UserRepository::find_by_id(&mut self.tx, user_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn lock_user(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        UserRepository::lock_by_id(&mut self.tx, user_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn find_user_by_phone(&mut self, phone_number: &str) -> Result<Option<User>, StoreError> {
        UserRepository::find_by_phone(&mut self.tx, phone_number)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        UserRepository::insert(&mut self.tx, user)
            .await
            .map_err(map_db_error)
    }

    async fn update_user_balance(&mut self, user_id: Uuid, balance: i64) -> Result<(), StoreError> {
        UserRepository::update_balance(&mut self.tx, user_id, balance)
            .await
            .map_err(map_db_error)
    }

    async fn update_free_pass(
        &mut self,
        user_id: Uuid,
        until: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        UserRepository::update_free_pass(&mut self.tx, user_id, until)
            .await
            .map_err(map_db_error)
    }

    async fn mark_user_deleted(&mut self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        UserRepository::mark_deleted(&mut self.tx, user_id, at)
            .await
            .map_err(map_db_error)
    }

    // Point ledger

    async fn insert_ledger_entry(&mut self, entry: &PointConsumption) -> Result<(), StoreError> {
        PointRepository::insert(&mut self.tx, entry)
            .await
            .map_err(map_db_error)
    }

    async fn find_ledger_entry_by_key(
        &mut self,
        idempotency_key: &str,
    ) -> Result<Option<PointConsumption>, StoreError> {
        PointRepository::find_by_key(&mut self.tx, idempotency_key)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn list_ledger_entries(&mut self, user_id: Uuid) -> Result<Vec<PointConsumption>, StoreError> {
        PointRepository::list_for_user(&mut self.tx, user_id)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(map_db_error)
    }

    // Hotplaces

    async fn list_active_hotplaces(&mut self) -> Result<Vec<Hotplace>, StoreError> {
        HotplaceRepository::list_active(&mut self.tx)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(map_db_error)
    }

    async fn find_hotplace(&mut self, hotplace_id: i64) -> Result<Option<Hotplace>, StoreError> {
        HotplaceRepository::find_by_id(&mut self.tx, hotplace_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn insert_hotplace(
        &mut self,
        hotplace: &NewHotplace,
        at: DateTime<Utc>,
    ) -> Result<Hotplace, StoreError> {
        HotplaceRepository::insert(&mut self.tx, hotplace, at)
            .await
            .map(Into::into)
            .map_err(map_db_error)
    }

    // Groups

    async fn insert_group(&mut self, group: &Group) -> Result<(), StoreError> {
        GroupRepository::insert_group(&mut self.tx, group)
            .await
            .map_err(map_db_error)
    }

    async fn find_group(&mut self, group_id: Uuid) -> Result<Option<Group>, StoreError> {
        GroupRepository::find_by_id(&mut self.tx, group_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn lock_group(&mut self, group_id: Uuid) -> Result<Option<Group>, StoreError> {
        GroupRepository::lock_by_id(&mut self.tx, group_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn deactivate_group(&mut self, group_id: Uuid) -> Result<(), StoreError> {
        GroupRepository::deactivate(&mut self.tx, group_id)
            .await
            .map_err(map_db_error)
    }

    async fn list_active_groups_in_hotplace(&mut self, hotplace_id: i64) -> Result<Vec<Group>, StoreError> {
        GroupRepository::list_active_in_hotplace(&mut self.tx, hotplace_id)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(map_db_error)
    }

    // Group members

    async fn insert_member(&mut self, member: &GroupMember) -> Result<(), StoreError> {
        GroupRepository::insert_member(&mut self.tx, member)
            .await
            .map_err(map_db_error)
    }

    async fn find_active_membership(&mut self, user_id: Uuid) -> Result<Option<GroupMember>, StoreError> {
        GroupRepository::find_active_membership(&mut self.tx, user_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn list_active_members(&mut self, group_id: Uuid) -> Result<Vec<GroupMember>, StoreError> {
        GroupRepository::list_active_members(&mut self.tx, group_id)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(map_db_error)
    }

    async fn deactivate_member(&mut self, member_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        GroupRepository::deactivate_member(&mut self.tx, member_id, at)
            .await
            .map_err(map_db_error)
    }

    async fn deactivate_members_of_group(
        &mut self,
        group_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        GroupRepository::deactivate_members_of_group(&mut self.tx, group_id, at)
            .await
            .map_err(map_db_error)
    }

    // Invitation codes

    async fn insert_invitation(&mut self, invitation: &InvitationCode) -> Result<(), StoreError> {
        InvitationRepository::insert(&mut self.tx, invitation)
            .await
            .map_err(map_db_error)
    }

    async fn find_active_invitation_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<InvitationCode>, StoreError> {
        InvitationRepository::find_active_by_code(&mut self.tx, code)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn deactivate_invitations_for_user(&mut self, issuer_id: Uuid) -> Result<u64, StoreError> {
        InvitationRepository::deactivate_for_issuer(&mut self.tx, issuer_id)
            .await
            .map_err(map_db_error)
    }

    async fn deactivate_invitations_for_group(&mut self, group_id: Uuid) -> Result<u64, StoreError> {
        InvitationRepository::deactivate_for_group(&mut self.tx, group_id)
            .await
            .map_err(map_db_error)
    }

    async fn consume_invitation(
        &mut self,
        code: &str,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<InvitationCode>, StoreError> {
        InvitationRepository::consume(&mut self.tx, code, user_id, at)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    // Match requests

    async fn lock_pair(&mut self, a: Uuid, b: Uuid) -> Result<(), StoreError> {
        MatchRequestRepository::lock_pair(&mut self.tx, a, b)
            .await
            .map_err(map_db_error)
    }

    async fn find_open_request_between(
        &mut self,
        a: Uuid,
        b: Uuid,
    ) -> Result<Option<MatchRequest>, StoreError> {
        MatchRequestRepository::find_open_between(&mut self.tx, a, b)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn insert_match_request(&mut self, request: &MatchRequest) -> Result<(), StoreError> {
        MatchRequestRepository::insert(&mut self.tx, request)
            .await
            .map_err(map_db_error)
    }

    async fn find_match_request(&mut self, request_id: Uuid) -> Result<Option<MatchRequest>, StoreError> {
        MatchRequestRepository::find_by_id(&mut self.tx, request_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn lock_match_request(&mut self, request_id: Uuid) -> Result<Option<MatchRequest>, StoreError> {
        MatchRequestRepository::lock_by_id(&mut self.tx, request_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn update_match_status(
        &mut self,
        request_id: Uuid,
        status: MatchStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        MatchRequestRepository::update_status(&mut self.tx, request_id, status, at)
            .await
            .map_err(map_db_error)
    }

    async fn deactivate_match_request(&mut self, request_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        MatchRequestRepository::deactivate(&mut self.tx, request_id, at)
            .await
            .map_err(map_db_error)
    }

    async fn deactivate_requests_for_group(
        &mut self,
        group_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        MatchRequestRepository::deactivate_for_group(&mut self.tx, group_id, at)
            .await
            .map_err(map_db_error)
    }

    async fn list_sent_requests(&mut self, group_id: Uuid) -> Result<Vec<MatchRequest>, StoreError> {
        MatchRequestRepository::list_sent(&mut self.tx, group_id)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(map_db_error)
    }

    async fn list_received_requests(&mut self, group_id: Uuid) -> Result<Vec<MatchRequest>, StoreError> {
        MatchRequestRepository::list_received(&mut self.tx, group_id)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(map_db_error)
    }

    // Chat channel bindings

    async fn insert_binding(&mut self, binding: &ChatChannelBinding) -> Result<(), StoreError> {
        ChatBindingRepository::insert_binding(&mut self.tx, binding)
            .await
            .map_err(map_db_error)
    }

    async fn list_bindings_for_request(
        &mut self,
        request_id: Uuid,
    ) -> Result<Vec<ChatChannelBinding>, StoreError> {
        ChatBindingRepository::list_for_request(&mut self.tx, request_id)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(map_db_error)
    }

    async fn list_active_bindings_for_channel(
        &mut self,
        channel_cid: &str,
    ) -> Result<Vec<ChatChannelBinding>, StoreError> {
        ChatBindingRepository::list_active_for_channel(&mut self.tx, channel_cid)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(map_db_error)
    }

    async fn list_active_bindings_for_user(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<ChatChannelBinding>, StoreError> {
        ChatBindingRepository::list_active_for_user(&mut self.tx, user_id)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(map_db_error)
    }

    async fn deactivate_bindings_for_channel(&mut self, channel_cid: &str) -> Result<u64, StoreError> {
        ChatBindingRepository::deactivate_for_channel(&mut self.tx, channel_cid)
            .await
            .map_err(map_db_error)
    }

    // Orphaned provider channels

    async fn insert_orphan_channel(&mut self, orphan: &OrphanChannel) -> Result<(), StoreError> {
        ChatBindingRepository::insert_orphan(&mut self.tx, orphan)
            .await
            .map_err(map_db_error)
    }

    async fn list_unresolved_orphans(&mut self, limit: i64) -> Result<Vec<OrphanChannel>, StoreError> {
        ChatBindingRepository::list_unresolved_orphans(&mut self.tx, limit)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(map_db_error)
    }

    async fn resolve_orphan(&mut self, orphan_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        ChatBindingRepository::resolve_orphan(&mut self.tx, orphan_id, at)
            .await
            .map_err(map_db_error)
    }

    // Deletion schedules

    async fn insert_deletion_schedule(&mut self, schedule: &DeletionSchedule) -> Result<(), StoreError> {
        DeletionRepository::insert(&mut self.tx, schedule)
            .await
            .map_err(map_db_error)
    }

    async fn find_waiting_schedule(&mut self, user_id: Uuid) -> Result<Option<DeletionSchedule>, StoreError> {
        DeletionRepository::find_waiting(&mut self.tx, user_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn list_due_schedules(
        &mut self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DeletionSchedule>, StoreError> {
        DeletionRepository::list_due(&mut self.tx, now, limit)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(map_db_error)
    }

    async fn lock_schedule(&mut self, schedule_id: Uuid) -> Result<Option<DeletionSchedule>, StoreError> {
        DeletionRepository::lock_by_id(&mut self.tx, schedule_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn update_schedule_status(
        &mut self,
        schedule_id: Uuid,
        status: DeletionStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        DeletionRepository::update_status(&mut self.tx, schedule_id, status, completed_at)
            .await
            .map_err(map_db_error)
    }

    // Purchases

    async fn find_purchase(&mut self, transaction_id: &str) -> Result<Option<PurchaseRecord>, StoreError> {
        PurchaseRepository::find_by_transaction_id(&mut self.tx, transaction_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(map_db_error)
    }

    async fn insert_purchase(&mut self, purchase: &PurchaseRecord) -> Result<(), StoreError> {
        PurchaseRepository::insert(&mut self.tx, purchase)
            .await
            .map_err(map_db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_map_to_database_kind() {
        let err = map_db_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn test_pool_closed_maps_to_database_kind() {
        let err = map_db_error(sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::Database(_)));
    }
}
