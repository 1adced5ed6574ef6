//! In-memory store for development and testing.
//!
//! Transactions are serialized behind one async mutex and work on a private
//! copy of the state that replaces the shared state on commit. Dropping a
//! transaction discards its copy. Unique indexes of the relational schema are
//! enforced on insert.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
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
use crate::store::{MeetupStore, StoreError, StoreTx};

#[derive(Debug, Clone, Default)]
struct State {
    users: HashMap<Uuid, User>,
    ledger: Vec<PointConsumption>,
    hotplaces: BTreeMap<i64, Hotplace>,
    groups: HashMap<Uuid, Group>,
    members: Vec<GroupMember>,
    invitations: Vec<InvitationCode>,
    requests: Vec<MatchRequest>,
    bindings: Vec<ChatChannelBinding>,
    orphans: Vec<OrphanChannel>,
    schedules: Vec<DeletionSchedule>,
    purchases: Vec<PurchaseRecord>,
}

/// Newest first; later inserts win ties.
fn newest_first<T: Clone>(rows: impl DoubleEndedIterator<Item = T>, key: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = rows.rev().collect();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    out
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation(constraint.to_string())
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    failing_commits: Arc<AtomicUsize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` commits fail with a database error, discarding their work.
    pub fn fail_next_commits(&self, n: usize) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    pub async fn users(&self) -> Vec<User> {
        self.state.lock().await.users.values().cloned().collect()
    }

    /// Every match request, oldest first.
    pub async fn match_requests(&self) -> Vec<MatchRequest> {
        self.state.lock().await.requests.clone()
    }

    /// Every binding, active or not.
    pub async fn bindings(&self) -> Vec<ChatChannelBinding> {
        self.state.lock().await.bindings.clone()
    }

    /// Every membership row, active or not.
    pub async fn memberships(&self) -> Vec<GroupMember> {
        self.state.lock().await.members.clone()
    }

    pub async fn ledger_entries(&self, user_id: Uuid) -> Vec<PointConsumption> {
        self.state
            .lock()
            .await
            .ledger
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn orphans(&self) -> Vec<OrphanChannel> {
        self.state.lock().await.orphans.clone()
    }

    pub async fn purchases(&self) -> Vec<PurchaseRecord> {
        self.state.lock().await.purchases.clone()
    }
}

#[async_trait]
impl MeetupStore for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(InMemoryTx {
            guard,
            work,
            failing_commits: self.failing_commits.clone(),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub struct InMemoryTx {
    guard: OwnedMutexGuard<State>,
    work: State,
    failing_commits: Arc<AtomicUsize>,
}

impl InMemoryTx {
    fn request_mut(&mut self, request_id: Uuid) -> Option<&mut MatchRequest> {
        self.work.requests.iter_mut().find(|r| r.id == request_id)
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn commit(self) -> Result<(), StoreError> {
        let InMemoryTx {
            mut guard,
            work,
            failing_commits,
        } = self;
        if failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Database("Simulated commit failure".to_string()));
        }
        *guard = work;
        Ok(())
    }

    async fn find_user(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.work.users.get(&user_id).cloned())
    }

    async fn lock_user(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        self.find_user(user_id).await
    }

    async fn find_user_by_phone(&mut self, phone_number: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .work
            .users
            .values()
            .find(|u| u.phone_number == phone_number)
            .cloned())
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        if self
            .work
            .users
            .values()
            .any(|u| u.phone_number == user.phone_number)
        {
            return Err(unique("users_phone_number_key"));
        }
        self.work.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user_balance(&mut self, user_id: Uuid, balance: i64) -> Result<(), StoreError> {
        if balance < 0 {
            return Err(StoreError::Database(
                "check constraint users_point_balance_check".into(),
            ));
        }
        if let Some(user) = self.work.users.get_mut(&user_id) {
            user.point_balance = balance;
        }
        Ok(())
    }

    async fn update_free_pass(&mut self, user_id: Uuid, until: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(user) = self.work.users.get_mut(&user_id) {
            user.free_pass_until = Some(until);
        }
        Ok(())
    }

    async fn mark_user_deleted(&mut self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(user) = self.work.users.get_mut(&user_id) {
            user.is_deleted = true;
            user.deleted_at = Some(at);
        }
        Ok(())
    }

    async fn insert_ledger_entry(&mut self, entry: &PointConsumption) -> Result<(), StoreError> {
        if let Some(key) = &entry.idempotency_key {
            if self
                .work
                .ledger
                .iter()
                .any(|e| e.idempotency_key.as_ref() == Some(key))
            {
                return Err(unique("point_consumptions_idempotency_key_key"));
            }
        }
        self.work.ledger.push(entry.clone());
        Ok(())
    }

    async fn find_ledger_entry_by_key(
        &mut self,
        idempotency_key: &str,
    ) -> Result<Option<PointConsumption>, StoreError> {
        Ok(self
            .work
            .ledger
            .iter()
            .find(|e| e.idempotency_key.as_deref() == Some(idempotency_key))
            .cloned())
    }

    async fn list_ledger_entries(&mut self, user_id: Uuid) -> Result<Vec<PointConsumption>, StoreError> {
        Ok(newest_first(
            self.work.ledger.iter().filter(|e| e.user_id == user_id).cloned(),
            |e| e.created_at,
        ))
    }

    async fn list_active_hotplaces(&mut self) -> Result<Vec<Hotplace>, StoreError> {
        Ok(self
            .work
            .hotplaces
            .values()
            .filter(|h| h.is_active)
            .cloned()
            .collect())
    }

    async fn find_hotplace(&mut self, hotplace_id: i64) -> Result<Option<Hotplace>, StoreError> {
        Ok(self.work.hotplaces.get(&hotplace_id).cloned())
    }

    async fn insert_hotplace(&mut self, hotplace: &NewHotplace, at: DateTime<Utc>) -> Result<Hotplace, StoreError> {
        let id = self.work.hotplaces.keys().next_back().copied().unwrap_or(0) + 1;
        let row = Hotplace {
            id,
            name: hotplace.name.clone(),
            polygon: hotplace.polygon.clone(),
            center: hotplace.center,
            is_active: true,
            created_at: at,
        };
        self.work.hotplaces.insert(id, row.clone());
        Ok(row)
    }

    async fn insert_group(&mut self, group: &Group) -> Result<(), StoreError> {
        self.work.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn find_group(&mut self, group_id: Uuid) -> Result<Option<Group>, StoreError> {
        Ok(self.work.groups.get(&group_id).cloned())
    }

    async fn lock_group(&mut self, group_id: Uuid) -> Result<Option<Group>, StoreError> {
        self.find_group(group_id).await
    }

    async fn deactivate_group(&mut self, group_id: Uuid) -> Result<(), StoreError> {
        if let Some(group) = self.work.groups.get_mut(&group_id) {
            group.is_active = false;
        }
        Ok(())
    }

    async fn list_active_groups_in_hotplace(&mut self, hotplace_id: i64) -> Result<Vec<Group>, StoreError> {
        let mut groups: Vec<Group> = self
            .work
            .groups
            .values()
            .filter(|g| g.is_active && g.hotplace_id == hotplace_id)
            .cloned()
            .collect();
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn insert_member(&mut self, member: &GroupMember) -> Result<(), StoreError> {
        if member.is_active
            && self
                .work
                .members
                .iter()
                .any(|m| m.is_active && m.user_id == member.user_id)
        {
            return Err(unique("group_members_one_active_per_user"));
        }
        self.work.members.push(member.clone());
        Ok(())
    }

    async fn find_active_membership(&mut self, user_id: Uuid) -> Result<Option<GroupMember>, StoreError> {
        Ok(self
            .work
            .members
            .iter()
            .find(|m| m.is_active && m.user_id == user_id)
            .cloned())
    }

    async fn list_active_members(&mut self, group_id: Uuid) -> Result<Vec<GroupMember>, StoreError> {
        Ok(self
            .work
            .members
            .iter()
            .filter(|m| m.is_active && m.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn deactivate_member(&mut self, member_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(member) = self.work.members.iter_mut().find(|m| m.id == member_id) {
            member.is_active = false;
            member.left_at = Some(at);
        }
        Ok(())
    }

    async fn deactivate_members_of_group(&mut self, group_id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut count = 0;
        for member in self
            .work
            .members
            .iter_mut()
            .filter(|m| m.is_active && m.group_id == group_id)
        {
            member.is_active = false;
            member.left_at = Some(at);
            count += 1;
        }
        Ok(count)
    }

    async fn insert_invitation(&mut self, invitation: &InvitationCode) -> Result<(), StoreError> {
        if invitation.is_active {
            if self
                .work
                .invitations
                .iter()
                .any(|i| i.is_active && i.code == invitation.code)
            {
                return Err(unique("invitation_codes_active_code"));
            }
            if self
                .work
                .invitations
                .iter()
                .any(|i| i.is_active && i.issuer_id == invitation.issuer_id)
            {
                return Err(unique("invitation_codes_one_active_per_issuer"));
            }
        }
        self.work.invitations.push(invitation.clone());
        Ok(())
    }

    async fn find_active_invitation_by_code(&mut self, code: &str) -> Result<Option<InvitationCode>, StoreError> {
        Ok(self
            .work
            .invitations
            .iter()
            .find(|i| i.is_active && i.code == code)
            .cloned())
    }

    async fn deactivate_invitations_for_user(&mut self, issuer_id: Uuid) -> Result<u64, StoreError> {
        let mut count = 0;
        for invitation in self
            .work
            .invitations
            .iter_mut()
            .filter(|i| i.is_active && i.issuer_id == issuer_id)
        {
            invitation.is_active = false;
            count += 1;
        }
        Ok(count)
    }

    async fn deactivate_invitations_for_group(&mut self, group_id: Uuid) -> Result<u64, StoreError> {
        let mut count = 0;
        for invitation in self
            .work
            .invitations
            .iter_mut()
            .filter(|i| i.is_active && i.group_id == group_id)
        {
            invitation.is_active = false;
            count += 1;
        }
        Ok(count)
    }

    async fn consume_invitation(
        &mut self,
        code: &str,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<InvitationCode>, StoreError> {
        let Some(invitation) = self
            .work
            .invitations
            .iter_mut()
            .find(|i| i.code == code && i.is_usable(at))
        else {
            return Ok(None);
        };
        invitation.is_active = false;
        invitation.used_by = Some(user_id);
        invitation.used_at = Some(at);
        Ok(Some(invitation.clone()))
    }

    async fn lock_pair(&mut self, _a: Uuid, _b: Uuid) -> Result<(), StoreError> {
        // The store mutex already serializes every transaction.
        Ok(())
    }

    async fn find_open_request_between(&mut self, a: Uuid, b: Uuid) -> Result<Option<MatchRequest>, StoreError> {
        Ok(self
            .work
            .requests
            .iter()
            .find(|r| r.is_open() && r.links(a, b))
            .cloned())
    }

    async fn insert_match_request(&mut self, request: &MatchRequest) -> Result<(), StoreError> {
        if request.is_open()
            && self
                .work
                .requests
                .iter()
                .any(|r| r.is_open() && r.links(request.sender_group_id, request.receiver_group_id))
        {
            return Err(unique("match_requests_open_pair"));
        }
        self.work.requests.push(request.clone());
        Ok(())
    }

    async fn find_match_request(&mut self, request_id: Uuid) -> Result<Option<MatchRequest>, StoreError> {
        Ok(self.work.requests.iter().find(|r| r.id == request_id).cloned())
    }

    async fn lock_match_request(&mut self, request_id: Uuid) -> Result<Option<MatchRequest>, StoreError> {
        self.find_match_request(request_id).await
    }

    async fn update_match_status(
        &mut self,
        request_id: Uuid,
        status: MatchStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(request) = self.request_mut(request_id) {
            request.status = status;
            request.updated_at = at;
        }
        Ok(())
    }

    async fn deactivate_match_request(&mut self, request_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(request) = self.request_mut(request_id) {
            if request.is_active {
                request.is_active = false;
                request.updated_at = at;
            }
        }
        Ok(())
    }

    async fn deactivate_requests_for_group(&mut self, group_id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut count = 0;
        for request in self
            .work
            .requests
            .iter_mut()
            .filter(|r| r.is_active && r.involves(group_id))
        {
            request.is_active = false;
            request.updated_at = at;
            count += 1;
        }
        Ok(count)
    }

    async fn list_sent_requests(&mut self, group_id: Uuid) -> Result<Vec<MatchRequest>, StoreError> {
        Ok(newest_first(
            self.work
                .requests
                .iter()
                .filter(|r| r.sender_group_id == group_id && r.status != MatchStatus::Canceled)
                .cloned(),
            |r| r.created_at,
        ))
    }

    async fn list_received_requests(&mut self, group_id: Uuid) -> Result<Vec<MatchRequest>, StoreError> {
        Ok(newest_first(
            self.work
                .requests
                .iter()
                .filter(|r| r.receiver_group_id == group_id && r.status != MatchStatus::Canceled)
                .cloned(),
            |r| r.created_at,
        ))
    }

    async fn insert_binding(&mut self, binding: &ChatChannelBinding) -> Result<(), StoreError> {
        self.work.bindings.push(binding.clone());
        Ok(())
    }

    async fn list_bindings_for_request(&mut self, request_id: Uuid) -> Result<Vec<ChatChannelBinding>, StoreError> {
        Ok(self
            .work
            .bindings
            .iter()
            .filter(|b| b.match_request_id == request_id)
            .cloned()
            .collect())
    }

    async fn list_active_bindings_for_channel(
        &mut self,
        channel_cid: &str,
    ) -> Result<Vec<ChatChannelBinding>, StoreError> {
        Ok(self
            .work
            .bindings
            .iter()
            .filter(|b| b.is_active && b.channel_cid == channel_cid)
            .cloned()
            .collect())
    }

    async fn list_active_bindings_for_user(&mut self, user_id: Uuid) -> Result<Vec<ChatChannelBinding>, StoreError> {
        Ok(self
            .work
            .bindings
            .iter()
            .filter(|b| b.is_active && b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn deactivate_bindings_for_channel(&mut self, channel_cid: &str) -> Result<u64, StoreError> {
        let mut count = 0;
        for binding in self
            .work
            .bindings
            .iter_mut()
            .filter(|b| b.is_active && b.channel_cid == channel_cid)
        {
            binding.is_active = false;
            count += 1;
        }
        Ok(count)
    }

    async fn insert_orphan_channel(&mut self, orphan: &OrphanChannel) -> Result<(), StoreError> {
        self.work.orphans.push(orphan.clone());
        Ok(())
    }

    async fn list_unresolved_orphans(&mut self, limit: i64) -> Result<Vec<OrphanChannel>, StoreError> {
        Ok(self
            .work
            .orphans
            .iter()
            .filter(|o| o.resolved_at.is_none())
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn resolve_orphan(&mut self, orphan_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(orphan) = self.work.orphans.iter_mut().find(|o| o.id == orphan_id) {
            orphan.resolved_at = Some(at);
        }
        Ok(())
    }

    async fn insert_deletion_schedule(&mut self, schedule: &DeletionSchedule) -> Result<(), StoreError> {
        if schedule.status == DeletionStatus::Waiting
            && self
                .work
                .schedules
                .iter()
                .any(|s| s.status == DeletionStatus::Waiting && s.user_id == schedule.user_id)
        {
            return Err(unique("deletion_schedules_one_waiting_per_user"));
        }
        self.work.schedules.push(schedule.clone());
        Ok(())
    }

    async fn find_waiting_schedule(&mut self, user_id: Uuid) -> Result<Option<DeletionSchedule>, StoreError> {
        Ok(self
            .work
            .schedules
            .iter()
            .find(|s| s.status == DeletionStatus::Waiting && s.user_id == user_id)
            .cloned())
    }

    async fn list_due_schedules(
        &mut self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DeletionSchedule>, StoreError> {
        let mut due: Vec<DeletionSchedule> = self
            .work
            .schedules
            .iter()
            .filter(|s| s.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|s| s.scheduled_at);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn lock_schedule(&mut self, schedule_id: Uuid) -> Result<Option<DeletionSchedule>, StoreError> {
        Ok(self
            .work
            .schedules
            .iter()
            .find(|s| s.id == schedule_id)
            .cloned())
    }

    async fn update_schedule_status(
        &mut self,
        schedule_id: Uuid,
        status: DeletionStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        if let Some(schedule) = self.work.schedules.iter_mut().find(|s| s.id == schedule_id) {
            schedule.status = status;
            schedule.completed_at = completed_at;
        }
        Ok(())
    }

    async fn find_purchase(&mut self, transaction_id: &str) -> Result<Option<PurchaseRecord>, StoreError> {
        Ok(self
            .work
            .purchases
            .iter()
            .find(|p| p.transaction_id == transaction_id)
            .cloned())
    }

    async fn insert_purchase(&mut self, purchase: &PurchaseRecord) -> Result<(), StoreError> {
        if self
            .work
            .purchases
            .iter()
            .any(|p| p.transaction_id == purchase.transaction_id)
        {
            return Err(unique("validated_purchases_transaction_id_key"));
        }
        self.work.purchases.push(purchase.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::hotplace::GeoPoint;

    fn user(phone: &str) -> User {
        User {
            id: Uuid::new_v4(),
            phone_number: phone.to_string(),
            point_balance: 0,
            free_pass_until: None,
            is_deleted: false,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let store = InMemoryStore::new();
        let u = user("+821011112222");
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_user(&u).await.unwrap();
        }
        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_user(u.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let store = InMemoryStore::new();
        let u = user("+821011112222");
        let mut tx = store.begin().await.unwrap();
        tx.insert_user(&u).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.find_user(u.id).await.unwrap(), Some(u));
    }

    #[tokio::test]
    async fn test_unique_phone() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_user(&user("+821011112222")).await.unwrap();
        let err = tx.insert_user(&user("+821011112222")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_one_active_membership_per_user() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let member = |group_id| GroupMember {
            id: Uuid::new_v4(),
            group_id,
            user_id,
            is_leader: false,
            is_active: true,
            joined_at: Utc::now(),
            left_at: None,
        };
        let mut tx = store.begin().await.unwrap();
        let first = member(Uuid::new_v4());
        tx.insert_member(&first).await.unwrap();
        assert!(tx.insert_member(&member(Uuid::new_v4())).await.is_err());

        tx.deactivate_member(first.id, Utc::now()).await.unwrap();
        tx.insert_member(&member(Uuid::new_v4())).await.unwrap();
    }

    #[tokio::test]
    async fn test_hotplace_ids_increase() {
        let store = InMemoryStore::new();
        let new = NewHotplace {
            name: "zone".to_string(),
            polygon: vec![
                GeoPoint::new(0.0, 0.0),
                GeoPoint::new(0.0, 1.0),
                GeoPoint::new(1.0, 1.0),
            ],
            center: GeoPoint::new(0.3, 0.6),
        };
        let mut tx = store.begin().await.unwrap();
        let a = tx.insert_hotplace(&new, Utc::now()).await.unwrap();
        let b = tx.insert_hotplace(&new, Utc::now()).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        let ids: Vec<i64> = tx
            .list_active_hotplaces()
            .await
            .unwrap()
            .iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_consume_invitation_once() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let invitation = InvitationCode {
            id: Uuid::new_v4(),
            code: "ABC-DEF-234".to_string(),
            issuer_id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            is_active: true,
            expires_at: now + chrono::Duration::minutes(5),
            created_at: now,
            used_by: None,
            used_at: None,
        };
        let mut tx = store.begin().await.unwrap();
        tx.insert_invitation(&invitation).await.unwrap();
        let first = tx
            .consume_invitation("ABC-DEF-234", Uuid::new_v4(), now)
            .await
            .unwrap();
        assert!(first.is_some());
        let second = tx
            .consume_invitation("ABC-DEF-234", Uuid::new_v4(), now)
            .await
            .unwrap();
        assert!(second.is_none());
    }
}
