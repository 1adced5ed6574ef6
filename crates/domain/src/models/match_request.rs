//! Match request domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Status of a match request.
///
/// ```text
/// WAITING -> ACCEPTED | REJECTED | CANCELED
/// ```
/// Terminal states never move again; deactivation is tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Waiting,
    Accepted,
    Rejected,
    Canceled,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Waiting => "waiting",
            MatchStatus::Accepted => "accepted",
            MatchStatus::Rejected => "rejected",
            MatchStatus::Canceled => "canceled",
        }
    }

    /// Returns true if the state machine has an edge from `self` to `next`.
    pub fn can_transition_to(&self, next: MatchStatus) -> bool {
        matches!(
            (self, next),
            (MatchStatus::Waiting, MatchStatus::Accepted)
                | (MatchStatus::Waiting, MatchStatus::Rejected)
                | (MatchStatus::Waiting, MatchStatus::Canceled)
        )
    }

    /// WAITING and ACCEPTED requests block a new request between the same pair.
    pub fn is_open(&self) -> bool {
        matches!(self, MatchStatus::Waiting | MatchStatus::Accepted)
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "waiting" => Ok(MatchStatus::Waiting),
            "accepted" => Ok(MatchStatus::Accepted),
            "rejected" => Ok(MatchStatus::Rejected),
            "canceled" => Ok(MatchStatus::Canceled),
            _ => Err(format!("Invalid match status: {}", s)),
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed offer from one group to another to open a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MatchRequest {
    pub id: Uuid,
    pub sender_group_id: Uuid,
    pub receiver_group_id: Uuid,
    pub status: MatchStatus,
    pub is_active: bool,
    /// Points debited from the issuer when the request was submitted.
    pub cost_paid: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchRequest {
    /// Active and in WAITING or ACCEPTED.
    pub fn is_open(&self) -> bool {
        self.is_active && self.status.is_open()
    }

    pub fn involves(&self, group_id: Uuid) -> bool {
        self.sender_group_id == group_id || self.receiver_group_id == group_id
    }

    /// True when this request links the unordered pair {a, b}.
    pub fn links(&self, a: Uuid, b: Uuid) -> bool {
        (self.sender_group_id == a && self.receiver_group_id == b)
            || (self.sender_group_id == b && self.receiver_group_id == a)
    }
}

/// Response for listing a caller's match requests.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MatchRequestList {
    pub sent: Vec<MatchRequest>,
    pub received: Vec<MatchRequest>,
}

/// Orders `(a, b)` so the same unordered pair always yields the same tuple.
pub fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [MatchStatus; 4] = [
        MatchStatus::Waiting,
        MatchStatus::Accepted,
        MatchStatus::Rejected,
        MatchStatus::Canceled,
    ];

    #[test]
    fn test_status_as_str_roundtrip() {
        for status in ALL {
            assert_eq!(MatchStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(MatchStatus::from_str("pending").is_err());
        assert_eq!(MatchStatus::from_str("WAITING").unwrap(), MatchStatus::Waiting);
    }

    #[test]
    fn test_only_waiting_has_outgoing_edges() {
        for from in ALL {
            for to in ALL {
                let expected = from == MatchStatus::Waiting && to != MatchStatus::Waiting;
                assert_eq!(from.can_transition_to(to), expected, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_open_statuses() {
        assert!(MatchStatus::Waiting.is_open());
        assert!(MatchStatus::Accepted.is_open());
        assert!(!MatchStatus::Rejected.is_open());
        assert!(!MatchStatus::Canceled.is_open());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&MatchStatus::Accepted).unwrap(),
            "\"ACCEPTED\""
        );
    }

    #[test]
    fn test_links_is_unordered() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let now = Utc::now();
        let req = MatchRequest {
            id: Uuid::new_v4(),
            sender_group_id: a,
            receiver_group_id: b,
            status: MatchStatus::Waiting,
            is_active: true,
            cost_paid: 3,
            created_at: now,
            updated_at: now,
        };
        assert!(req.links(a, b));
        assert!(req.links(b, a));
        assert!(!req.links(a, Uuid::new_v4()));
        assert!(req.is_open());
    }

    #[test]
    fn test_ordered_pair() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(ordered_pair(a, b), ordered_pair(b, a));
    }
}
