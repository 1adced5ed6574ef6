//! Storage seam for the match lifecycle.
//!
//! Every inbound operation runs inside one [`StoreTx`]. A transaction that is
//! dropped without [`StoreTx::commit`] is rolled back, so returning early with
//! `?` never leaves partial writes behind.
//!
//! Methods named `lock_*` take a row lock held until the transaction ends.
//! `find_*` and `list_*` apply the filters their names spell out; there is no
//! hidden "active only" default.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::chat::{ChatChannelBinding, OrphanChannel};
use crate::models::deletion::{DeletionSchedule, DeletionStatus};
use crate::models::group::{Group, GroupMember};
use crate::models::hotplace::{Hotplace, NewHotplace};
use crate::models::invitation::InvitationCode;
use crate::models::match_request::{MatchRequest, MatchStatus};
use crate::models::point::PointConsumption;
use crate::models::purchase::PurchaseRecord;
use crate::models::user::User;

/// Errors raised by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    /// A unique index rejected the write; carries the constraint name.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Referenced row missing: {0}")]
    ForeignKeyViolation(String),
}

/// Opens transactions against the system of record.
#[async_trait]
pub trait MeetupStore: Send + Sync + Clone + 'static {
    type Tx: StoreTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Round-trips to the backing store without touching any rows.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// One unit of work against the system of record.
#[async_trait]
pub trait StoreTx: Send + Sized {
    async fn commit(self) -> Result<(), StoreError>;

    // Users

    async fn find_user(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError>;
    async fn lock_user(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_phone(&mut self, phone_number: &str)
        -> Result<Option<User>, StoreError>;
    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError>;
    async fn update_user_balance(&mut self, user_id: Uuid, balance: i64)
        -> Result<(), StoreError>;
    async fn update_free_pass(
        &mut self,
        user_id: Uuid,
        until: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    async fn mark_user_deleted(&mut self, user_id: Uuid, at: DateTime<Utc>)
        -> Result<(), StoreError>;

    // Point ledger

    async fn insert_ledger_entry(&mut self, entry: &PointConsumption) -> Result<(), StoreError>;
    async fn find_ledger_entry_by_key(
        &mut self,
        idempotency_key: &str,
    ) -> Result<Option<PointConsumption>, StoreError>;
    /// Newest first.
    async fn list_ledger_entries(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<PointConsumption>, StoreError>;

    // Hotplaces

    /// Active hotplaces ordered by id.
    async fn list_active_hotplaces(&mut self) -> Result<Vec<Hotplace>, StoreError>;
    async fn find_hotplace(&mut self, hotplace_id: i64) -> Result<Option<Hotplace>, StoreError>;
    async fn insert_hotplace(
        &mut self,
        hotplace: &NewHotplace,
        at: DateTime<Utc>,
    ) -> Result<Hotplace, StoreError>;

    // Groups

    async fn insert_group(&mut self, group: &Group) -> Result<(), StoreError>;
    async fn find_group(&mut self, group_id: Uuid) -> Result<Option<Group>, StoreError>;
    async fn lock_group(&mut self, group_id: Uuid) -> Result<Option<Group>, StoreError>;
    async fn deactivate_group(&mut self, group_id: Uuid) -> Result<(), StoreError>;
    /// Newest first.
    async fn list_active_groups_in_hotplace(
        &mut self,
        hotplace_id: i64,
    ) -> Result<Vec<Group>, StoreError>;

    // Group members

    async fn insert_member(&mut self, member: &GroupMember) -> Result<(), StoreError>;
    async fn find_active_membership(
        &mut self,
        user_id: Uuid,
    ) -> Result<Option<GroupMember>, StoreError>;
    /// Ordered by join time.
    async fn list_active_members(&mut self, group_id: Uuid)
        -> Result<Vec<GroupMember>, StoreError>;
    async fn deactivate_member(&mut self, member_id: Uuid, at: DateTime<Utc>)
        -> Result<(), StoreError>;
    async fn deactivate_members_of_group(
        &mut self,
        group_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    // Invitation codes

    async fn insert_invitation(&mut self, invitation: &InvitationCode) -> Result<(), StoreError>;
    async fn find_active_invitation_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<InvitationCode>, StoreError>;
    async fn deactivate_invitations_for_user(&mut self, issuer_id: Uuid)
        -> Result<u64, StoreError>;
    async fn deactivate_invitations_for_group(&mut self, group_id: Uuid)
        -> Result<u64, StoreError>;
    /// Atomically flips an active, unexpired code to used. `None` when the
    /// code is unknown, expired, or was consumed first by someone else.
    async fn consume_invitation(
        &mut self,
        code: &str,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<InvitationCode>, StoreError>;

    // Match requests

    /// Serializes writers on the unordered pair until the transaction ends.
    async fn lock_pair(&mut self, a: Uuid, b: Uuid) -> Result<(), StoreError>;
    /// Active request in WAITING or ACCEPTED between `a` and `b`, either direction.
    async fn find_open_request_between(
        &mut self,
        a: Uuid,
        b: Uuid,
    ) -> Result<Option<MatchRequest>, StoreError>;
    async fn insert_match_request(&mut self, request: &MatchRequest) -> Result<(), StoreError>;
    async fn find_match_request(
        &mut self,
        request_id: Uuid,
    ) -> Result<Option<MatchRequest>, StoreError>;
    async fn lock_match_request(
        &mut self,
        request_id: Uuid,
    ) -> Result<Option<MatchRequest>, StoreError>;
    async fn update_match_status(
        &mut self,
        request_id: Uuid,
        status: MatchStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    async fn deactivate_match_request(
        &mut self,
        request_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    /// Deactivates every active request where the group is sender or receiver.
    async fn deactivate_requests_for_group(
        &mut self,
        group_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
    /// Requests sent by the group, excluding CANCELED, newest first.
    async fn list_sent_requests(&mut self, group_id: Uuid)
        -> Result<Vec<MatchRequest>, StoreError>;
    /// Requests received by the group, excluding CANCELED, newest first.
    async fn list_received_requests(
        &mut self,
        group_id: Uuid,
    ) -> Result<Vec<MatchRequest>, StoreError>;

    // Chat channel bindings

    async fn insert_binding(&mut self, binding: &ChatChannelBinding) -> Result<(), StoreError>;
    /// All bindings seeded by the request, active or not.
    async fn list_bindings_for_request(
        &mut self,
        request_id: Uuid,
    ) -> Result<Vec<ChatChannelBinding>, StoreError>;
    async fn list_active_bindings_for_channel(
        &mut self,
        channel_cid: &str,
    ) -> Result<Vec<ChatChannelBinding>, StoreError>;
    async fn list_active_bindings_for_user(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<ChatChannelBinding>, StoreError>;
    async fn deactivate_bindings_for_channel(
        &mut self,
        channel_cid: &str,
    ) -> Result<u64, StoreError>;

    // Orphaned provider channels

    async fn insert_orphan_channel(&mut self, orphan: &OrphanChannel) -> Result<(), StoreError>;
    async fn list_unresolved_orphans(&mut self, limit: i64)
        -> Result<Vec<OrphanChannel>, StoreError>;
    async fn resolve_orphan(&mut self, orphan_id: Uuid, at: DateTime<Utc>)
        -> Result<(), StoreError>;

    // Deletion schedules

    async fn insert_deletion_schedule(
        &mut self,
        schedule: &DeletionSchedule,
    ) -> Result<(), StoreError>;
    async fn find_waiting_schedule(
        &mut self,
        user_id: Uuid,
    ) -> Result<Option<DeletionSchedule>, StoreError>;
    /// WAITING schedules with `scheduled_at < now`, oldest first.
    async fn list_due_schedules(
        &mut self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DeletionSchedule>, StoreError>;
    async fn lock_schedule(
        &mut self,
        schedule_id: Uuid,
    ) -> Result<Option<DeletionSchedule>, StoreError>;
    async fn update_schedule_status(
        &mut self,
        schedule_id: Uuid,
        status: DeletionStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    // Purchases

    async fn find_purchase(
        &mut self,
        transaction_id: &str,
    ) -> Result<Option<PurchaseRecord>, StoreError>;
    async fn insert_purchase(&mut self, purchase: &PurchaseRecord) -> Result<(), StoreError>;
}
