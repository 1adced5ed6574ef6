//! Group domain models for meetup groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::hotplace::GeoPoint;

/// Represents a meetup group bound to a hotplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Group {
    pub id: Uuid,
    pub hotplace_id: i64,
    pub location: GeoPoint,
    pub title: String,
    pub introduction: Option<String>,
    pub meetup_starts_at: DateTime<Utc>,
    pub meetup_ends_at: DateTime<Utc>,
    /// Points charged to a group sending a match request to this group.
    pub match_cost: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Represents a user's membership in a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupMember {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub is_leader: bool,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

/// Editable profile of a group.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
#[validate(schema(function = "validate_meetup_window"))]
pub struct GroupProfile {
    #[validate(length(min = 1, max = 50, message = "Title must be between 1 and 50 characters"))]
    pub title: String,

    #[validate(length(max = 500, message = "Introduction must be at most 500 characters"))]
    pub introduction: Option<String>,

    pub meetup_starts_at: DateTime<Utc>,

    pub meetup_ends_at: DateTime<Utc>,

    #[validate(custom(function = "shared::validation::validate_match_cost"))]
    pub match_cost: i64,
}

fn validate_meetup_window(profile: &GroupProfile) -> Result<(), ValidationError> {
    if profile.meetup_starts_at < profile.meetup_ends_at {
        Ok(())
    } else {
        let mut err = ValidationError::new("meetup_window");
        err.message = Some("Meetup must start before it ends".into());
        Err(err)
    }
}

/// Request payload for creating a group.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateGroupRequest {
    #[validate(nested)]
    pub location: GeoPoint,

    #[validate(nested)]
    pub profile: GroupProfile,
}

/// A group together with its active roster.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupDetail {
    pub group: Group,
    pub members: Vec<GroupMember>,
}

impl GroupDetail {
    pub fn leader(&self) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.is_leader && m.is_active)
    }
}

/// Outcome of a member leaving a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveOutcome {
    /// The member left; the group is still active.
    Left,
    /// The group was closed (leader left or last member departed).
    GroupClosed,
}
