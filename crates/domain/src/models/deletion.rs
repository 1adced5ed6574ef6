//! Scheduled user deletion models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Status of a deletion schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeletionStatus {
    Waiting,
    Completed,
    Canceled,
}

impl DeletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionStatus::Waiting => "waiting",
            DeletionStatus::Completed => "completed",
            DeletionStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for DeletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pending or finished request to delete a user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeletionSchedule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reason: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: DeletionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DeletionSchedule {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == DeletionStatus::Waiting && self.scheduled_at < now
    }
}

/// What the worker did for one schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DeletionReport {
    pub schedule_id: Uuid,
    pub user_id: Uuid,
    pub disbanded_group_id: Option<Uuid>,
    pub deactivated_requests: u64,
    pub channel_cids: Vec<String>,
}

/// Summary of one worker pass.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DeletionRunSummary {
    pub completed: Vec<DeletionReport>,
    pub failed: usize,
}
