//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

use crate::models::MatchStatus;
use crate::store::StoreError;

/// Coarse error classes the transport maps onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AuthorizationFailure,
    Precondition,
    InsufficientBalance,
    NotFound,
    Conflict,
    UpstreamFailure,
    DeadlineExceeded,
    Internal,
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("User {user_id} is not an active member of group {group_id}")]
    NotGroupMember { user_id: Uuid, group_id: Uuid },

    #[error("User {0} is not the leader of an active group")]
    NotLeader(Uuid),

    #[error("User {0} is not a member of the receiving group")]
    NotReceiver(Uuid),

    #[error("User {0} is not a member of the sending group")]
    NotSender(Uuid),

    #[error("User {user_id} has no active binding on channel {channel_cid}")]
    NotChannelMember { user_id: Uuid, channel_cid: String },

    #[error("Webhook signature verification failed")]
    InvalidSignature,

    #[error("User {0} already belongs to an active group")]
    AlreadyInGroup(Uuid),

    #[error("User {0} does not belong to an active group")]
    NotInGroup(Uuid),

    #[error("A group cannot send a match request to itself")]
    SelfTarget,

    #[error("An open match request already exists between these groups")]
    DuplicateOpenRequest,

    #[error("Location is not inside any active hotplace")]
    NotInAnyHotplace,

    #[error("Group {0} is not active")]
    GroupInactive(Uuid),

    #[error("Group {0} is full")]
    GroupFull(Uuid),

    #[error("Cannot move match request from {from} to {to}")]
    InvalidTransition { from: MatchStatus, to: MatchStatus },

    #[error("Match request {0} is no longer active")]
    RequestInactive(Uuid),

    #[error("User {0} already has a pending deletion")]
    DeletionAlreadyScheduled(Uuid),

    #[error("User {0} has no pending deletion")]
    NoPendingDeletion(Uuid),

    #[error("User {0} is deleted")]
    UserDeleted(Uuid),

    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Invitation code is expired or already used")]
    CodeExpiredOrUsed,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Chat channel creation failed: {0}")]
    ChatCreationFailed(String),

    #[error("Upstream provider failed: {0}")]
    Upstream(String),

    #[error("Operation deadline exceeded")]
    DeadlineExceeded,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotGroupMember { .. }
            | DomainError::NotLeader(_)
            | DomainError::NotReceiver(_)
            | DomainError::NotSender(_)
            | DomainError::NotChannelMember { .. }
            | DomainError::InvalidSignature => ErrorKind::AuthorizationFailure,

            DomainError::AlreadyInGroup(_)
            | DomainError::NotInGroup(_)
            | DomainError::SelfTarget
            | DomainError::DuplicateOpenRequest
            | DomainError::NotInAnyHotplace
            | DomainError::GroupInactive(_)
            | DomainError::GroupFull(_)
            | DomainError::InvalidTransition { .. }
            | DomainError::RequestInactive(_)
            | DomainError::DeletionAlreadyScheduled(_)
            | DomainError::NoPendingDeletion(_)
            | DomainError::UserDeleted(_)
            | DomainError::UnknownProduct(_)
            | DomainError::CodeExpiredOrUsed
            | DomainError::Validation(_) => ErrorKind::Precondition,

            DomainError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::ChatCreationFailed(_) | DomainError::Upstream(_) => {
                ErrorKind::UpstreamFailure
            }
            DomainError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            DomainError::Store(StoreError::UniqueViolation(_)) => ErrorKind::Conflict,
            DomainError::Store(_) | DomainError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True when the error came from a unique index rejecting a write.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DomainError::Store(StoreError::UniqueViolation(_)))
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::Validation(errors.to_string())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_kinds() {
        assert_eq!(
            DomainError::NotLeader(Uuid::nil()).kind(),
            ErrorKind::AuthorizationFailure
        );
        assert_eq!(
            DomainError::NotReceiver(Uuid::nil()).kind(),
            ErrorKind::AuthorizationFailure
        );
    }

    #[test]
    fn test_precondition_kinds() {
        assert_eq!(DomainError::SelfTarget.kind(), ErrorKind::Precondition);
        assert_eq!(
            DomainError::InvalidTransition {
                from: MatchStatus::Rejected,
                to: MatchStatus::Accepted,
            }
            .kind(),
            ErrorKind::Precondition
        );
    }

    #[test]
    fn test_store_unique_violation_is_conflict() {
        let err: DomainError = StoreError::UniqueViolation("idx".into()).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.is_unique_violation());

        let err: DomainError = StoreError::Database("boom".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn test_insufficient_balance_message() {
        let err = DomainError::InsufficientBalance {
            required: 3,
            available: 2,
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(
            err.to_string(),
            "Insufficient balance: required 3, available 2"
        );
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = DomainError::InvalidTransition {
            from: MatchStatus::Canceled,
            to: MatchStatus::Accepted,
        };
        assert_eq!(
            err.to_string(),
            "Cannot move match request from canceled to accepted"
        );
    }
}
