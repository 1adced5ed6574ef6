//! Group registry: creation, invitations, membership and disbanding.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::errors::{DomainError, DomainResult};
use crate::models::group::{CreateGroupRequest, Group, GroupDetail, GroupMember, LeaveOutcome};
use crate::models::invitation::InvitationCode;
use crate::models::user::User;
use crate::services::hotplace_index;
use crate::settings::CoreSettings;
use crate::store::{MeetupStore, StoreTx};

/// Attempts at drawing an unused invitation code before giving up.
const CODE_ATTEMPTS: usize = 5;

pub(crate) async fn load_live_user<T: StoreTx>(tx: &mut T, user_id: Uuid) -> DomainResult<User> {
    let user = tx
        .find_user(user_id)
        .await?
        .ok_or_else(|| DomainError::not_found("User", user_id))?;
    if user.is_deleted {
        return Err(DomainError::UserDeleted(user_id));
    }
    Ok(user)
}

/// Closes a group: deactivates it, its roster, its invitation codes and every
/// request it sends or receives. Returns the number of requests deactivated.
///
/// Chat channels stay bound until each is exited.
pub(crate) async fn disband_in_tx<T: StoreTx>(
    tx: &mut T,
    group_id: Uuid,
    now: DateTime<Utc>,
) -> DomainResult<u64> {
    tx.deactivate_group(group_id).await?;
    let members = tx.deactivate_members_of_group(group_id, now).await?;
    tx.deactivate_invitations_for_group(group_id).await?;
    let requests = tx.deactivate_requests_for_group(group_id, now).await?;
    info!(
        group_id = %group_id,
        members,
        requests,
        "Group disbanded"
    );
    Ok(requests)
}

#[derive(Clone)]
pub struct GroupRegistry<S: MeetupStore> {
    store: S,
    settings: Arc<CoreSettings>,
}

impl<S: MeetupStore> GroupRegistry<S> {
    pub fn new(store: S, settings: Arc<CoreSettings>) -> Self {
        Self { store, settings }
    }

    /// Creates a group led by `leader` at the requested location.
    pub async fn create_group(&self, leader: Uuid, request: CreateGroupRequest) -> DomainResult<Group> {
        request.validate()?;
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        load_live_user(&mut tx, leader).await?;

        let hotplaces = tx.list_active_hotplaces().await?;
        let hotplace = hotplace_index::locate(&hotplaces, &request.location)
            .ok_or(DomainError::NotInAnyHotplace)?;

        if tx.find_active_membership(leader).await?.is_some() {
            return Err(DomainError::AlreadyInGroup(leader));
        }

        let profile = request.profile;
        let group = Group {
            id: Uuid::new_v4(),
            hotplace_id: hotplace.id,
            location: request.location,
            title: profile.title,
            introduction: profile.introduction,
            meetup_starts_at: profile.meetup_starts_at,
            meetup_ends_at: profile.meetup_ends_at,
            match_cost: profile.match_cost,
            is_active: true,
            created_at: now,
        };
        tx.insert_group(&group).await?;

        let member = GroupMember {
            id: Uuid::new_v4(),
            group_id: group.id,
            user_id: leader,
            is_leader: true,
            is_active: true,
            joined_at: now,
            left_at: None,
        };
        tx.insert_member(&member)
            .await
            .map_err(|e| membership_conflict(e.into(), leader))?;
        tx.commit()
            .await
            .map_err(|e| membership_conflict(e.into(), leader))?;

        info!(
            group_id = %group.id,
            hotplace_id = group.hotplace_id,
            leader = %leader,
            "Group created"
        );
        Ok(group)
    }

    /// Issues a fresh invitation code, retiring the leader's previous one.
    pub async fn issue_invitation(&self, leader: Uuid) -> DomainResult<InvitationCode> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        load_live_user(&mut tx, leader).await?;
        let membership = tx
            .find_active_membership(leader)
            .await?
            .filter(|m| m.is_leader)
            .ok_or(DomainError::NotLeader(leader))?;

        // Serializes concurrent issues for the group.
        let group = tx
            .lock_group(membership.group_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Group", membership.group_id))?;
        if !group.is_active {
            return Err(DomainError::GroupInactive(group.id));
        }

        tx.deactivate_invitations_for_user(leader).await?;

        let mut code = None;
        for _ in 0..CODE_ATTEMPTS {
            let candidate = shared::codes::generate_invitation_code();
            if tx.find_active_invitation_by_code(&candidate).await?.is_none() {
                code = Some(candidate);
                break;
            }
        }
        let code = code.ok_or_else(|| {
            DomainError::Internal("Could not allocate an unused invitation code".into())
        })?;

        let invitation = InvitationCode {
            id: Uuid::new_v4(),
            code,
            issuer_id: leader,
            group_id: group.id,
            is_active: true,
            expires_at: now + self.settings.invitation_ttl,
            created_at: now,
            used_by: None,
            used_at: None,
        };
        tx.insert_invitation(&invitation).await?;
        tx.commit().await?;

        info!(group_id = %group.id, issuer = %leader, "Invitation code issued");
        Ok(invitation)
    }

    /// Consumes an invitation code and joins its group.
    pub async fn accept_invitation(&self, code: &str, invitee: Uuid) -> DomainResult<GroupMember> {
        let code = shared::codes::normalize_code(code);
        if !shared::validation::INVITATION_CODE_REGEX.is_match(&code) {
            return Err(DomainError::Validation(
                "Invalid invitation code format. Expected XXX-XXX-XXX".into(),
            ));
        }

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        load_live_user(&mut tx, invitee).await?;

        if tx.find_active_membership(invitee).await?.is_some() {
            return Err(DomainError::AlreadyInGroup(invitee));
        }

        let invitation = tx
            .consume_invitation(&code, invitee, now)
            .await?
            .ok_or(DomainError::CodeExpiredOrUsed)?;

        let group = tx
            .lock_group(invitation.group_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Group", invitation.group_id))?;
        if !group.is_active {
            return Err(DomainError::GroupInactive(group.id));
        }

        let roster = tx.list_active_members(group.id).await?;
        if roster.len() >= self.settings.max_group_members {
            return Err(DomainError::GroupFull(group.id));
        }

        let member = GroupMember {
            id: Uuid::new_v4(),
            group_id: group.id,
            user_id: invitee,
            is_leader: false,
            is_active: true,
            joined_at: now,
            left_at: None,
        };
        if let Err(e) = tx.insert_member(&member).await {
            let e = DomainError::from(e);
            if !e.is_unique_violation() {
                return Err(e);
            }
            drop(tx);
            return self.reread_membership(invitee, group.id).await;
        }

        match tx.commit().await {
            Ok(()) => {}
            Err(e) => {
                let e = DomainError::from(e);
                if !e.is_unique_violation() {
                    return Err(e);
                }
                return self.reread_membership(invitee, group.id).await;
            }
        }

        info!(group_id = %group.id, user_id = %invitee, "Invitation accepted");
        Ok(member)
    }

    /// A concurrent join won the race for this user's membership slot.
    /// Success if it landed in the same group.
    async fn reread_membership(&self, user_id: Uuid, group_id: Uuid) -> DomainResult<GroupMember> {
        let mut tx = self.store.begin().await?;
        match tx.find_active_membership(user_id).await? {
            Some(existing) if existing.group_id == group_id => Ok(existing),
            _ => Err(DomainError::AlreadyInGroup(user_id)),
        }
    }

    /// Disbands the caller's group. Only the leader may do this.
    pub async fn disband_group(&self, leader: Uuid) -> DomainResult<Uuid> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let membership = tx
            .find_active_membership(leader)
            .await?
            .filter(|m| m.is_leader)
            .ok_or(DomainError::NotLeader(leader))?;

        let group = tx
            .lock_group(membership.group_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Group", membership.group_id))?;
        if !group.is_active {
            return Err(DomainError::GroupInactive(group.id));
        }

        disband_in_tx(&mut tx, group.id, now).await?;
        tx.commit().await?;
        Ok(group.id)
    }

    /// Leaves the caller's group. A leader leaving disbands it.
    pub async fn leave_group(&self, user_id: Uuid) -> DomainResult<LeaveOutcome> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let membership = tx
            .find_active_membership(user_id)
            .await?
            .ok_or(DomainError::NotInGroup(user_id))?;
        let group = tx
            .lock_group(membership.group_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Group", membership.group_id))?;

        let outcome = if membership.is_leader {
            disband_in_tx(&mut tx, group.id, now).await?;
            LeaveOutcome::GroupClosed
        } else {
            tx.deactivate_member(membership.id, now).await?;
            if tx.list_active_members(group.id).await?.is_empty() {
                disband_in_tx(&mut tx, group.id, now).await?;
                LeaveOutcome::GroupClosed
            } else {
                LeaveOutcome::Left
            }
        };
        tx.commit().await?;

        info!(group_id = %group.id, user_id = %user_id, outcome = ?outcome, "Member left group");
        Ok(outcome)
    }

    /// Active groups of a hotplace other than the caller's own, newest first.
    pub async fn list_groups_in_hotplace(
        &self,
        caller: Uuid,
        hotplace_id: i64,
    ) -> DomainResult<Vec<Group>> {
        let mut tx = self.store.begin().await?;
        tx.find_hotplace(hotplace_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Hotplace", hotplace_id))?;

        let own_group = tx.find_active_membership(caller).await?.map(|m| m.group_id);
        let groups = tx.list_active_groups_in_hotplace(hotplace_id).await?;
        Ok(groups
            .into_iter()
            .filter(|g| Some(g.id) != own_group)
            .collect())
    }

    /// A group and its active roster.
    pub async fn get_group(&self, group_id: Uuid) -> DomainResult<GroupDetail> {
        let mut tx = self.store.begin().await?;
        let group = tx
            .find_group(group_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Group", group_id))?;
        let members = tx.list_active_members(group_id).await?;
        Ok(GroupDetail { group, members })
    }

    /// The caller's active group, if any.
    pub async fn my_group(&self, user_id: Uuid) -> DomainResult<Option<GroupDetail>> {
        let group_id = {
            let mut tx = self.store.begin().await?;
            tx.find_active_membership(user_id).await?.map(|m| m.group_id)
        };
        match group_id {
            Some(id) => self.get_group(id).await.map(Some),
            None => Ok(None),
        }
    }
}

/// Maps a unique-index rejection on the membership slot to `AlreadyInGroup`.
fn membership_conflict(e: DomainError, user_id: Uuid) -> DomainError {
    if e.is_unique_violation() {
        DomainError::AlreadyInGroup(user_id)
    } else {
        e
    }
}
