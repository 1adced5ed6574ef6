//! Point ledger domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryKind {
    Debit,
    Credit,
}

impl LedgerEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryKind::Debit => "debit",
            LedgerEntryKind::Credit => "credit",
        }
    }
}

/// Reason code attached to every ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointReason {
    MatchRequest,
    Purchase,
    SignupBonus,
    Adjustment,
}

impl PointReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointReason::MatchRequest => "match_request",
            PointReason::Purchase => "purchase",
            PointReason::SignupBonus => "signup_bonus",
            PointReason::Adjustment => "adjustment",
        }
    }
}

impl FromStr for PointReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match_request" => Ok(PointReason::MatchRequest),
            "purchase" => Ok(PointReason::Purchase),
            "signup_bonus" => Ok(PointReason::SignupBonus),
            "adjustment" => Ok(PointReason::Adjustment),
            _ => Err(format!("Invalid point reason: {}", s)),
        }
    }
}

impl fmt::Display for PointReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only ledger history row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PointConsumption {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: LedgerEntryKind,
    /// Always positive; the direction comes from `kind`.
    pub amount: i64,
    pub reason: PointReason,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a ledger row.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: Uuid,
    pub kind: LedgerEntryKind,
    pub amount: i64,
    pub reason: PointReason,
    pub idempotency_key: Option<String>,
}

/// Outcome of an idempotent credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CreditOutcome {
    Applied { balance: i64 },
    AlreadyApplied { balance: i64 },
}

impl CreditOutcome {
    pub fn balance(&self) -> i64 {
        match self {
            CreditOutcome::Applied { balance } | CreditOutcome::AlreadyApplied { balance } => {
                *balance
            }
        }
    }
}

/// Ledger snapshot for a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PointStatement {
    pub balance: i64,
    pub free_pass_until: Option<DateTime<Utc>>,
    pub history: Vec<PointConsumption>,
}

impl PointStatement {
    /// Sum of credits minus sum of debits; equals `balance` when the ledger is consistent.
    pub fn net_history(&self) -> i64 {
        self.history
            .iter()
            .map(|e| match e.kind {
                LedgerEntryKind::Credit => e.amount,
                LedgerEntryKind::Debit => -e.amount,
            })
            .sum()
    }
}
