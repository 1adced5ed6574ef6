//! Invitation code domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Single-use code a leader hands out to bring someone into their group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InvitationCode {
    pub id: Uuid,
    pub code: String,
    pub issuer_id: Uuid,
    pub group_id: Uuid,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub used_by: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
}

impl InvitationCode {
    /// Returns true when the code can still be consumed at `now`.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.expires_at
    }
}

/// Request to join a group using an invitation code.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct AcceptInvitationRequest {
    /// The invitation code in XXX-XXX-XXX format.
    #[validate(regex(
        path = *shared::validation::INVITATION_CODE_REGEX,
        message = "Invalid invitation code format. Expected XXX-XXX-XXX"
    ))]
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn code(is_active: bool, expires_at: DateTime<Utc>) -> InvitationCode {
        InvitationCode {
            id: Uuid::new_v4(),
            code: "ABC-DEF-234".to_string(),
            issuer_id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            is_active,
            expires_at,
            created_at: Utc::now(),
            used_by: None,
            used_at: None,
        }
    }

    #[test]
    fn test_is_usable() {
        let now = Utc::now();
        assert!(code(true, now + Duration::minutes(5)).is_usable(now));
        assert!(!code(false, now + Duration::minutes(5)).is_usable(now));
        assert!(!code(true, now).is_usable(now));
    }

    #[test]
    fn test_accept_request_format() {
        let ok = AcceptInvitationRequest {
            code: "ABC-DEF-234".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = AcceptInvitationRequest {
            code: "ABCDEF234".to_string(),
        };
        assert!(bad.validate().is_err());
    }
}
