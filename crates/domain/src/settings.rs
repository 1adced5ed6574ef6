//! Tunables for the match lifecycle, filled from the api crate's config.

use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;

/// How an active free pass interacts with the match request debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreePassPolicy {
    /// Callers holding an active pass submit without being debited.
    Exempt,
    /// The pass is informational; every submit is debited.
    Charge,
}

#[derive(Debug, Clone)]
pub struct CoreSettings {
    pub free_pass_policy: FreePassPolicy,
    /// Points credited once at registration.
    pub initial_points: i64,
    pub max_group_members: usize,
    pub invitation_ttl: chrono::Duration,
    pub deletion_grace: chrono::Duration,
    pub deletion_batch_size: i64,
    pub operation_timeout: StdDuration,
    pub chat_channel_type: String,
    /// Provider channels younger than this are never treated as orphans.
    pub orphan_grace: chrono::Duration,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            free_pass_policy: FreePassPolicy::Exempt,
            initial_points: 10,
            max_group_members: 6,
            invitation_ttl: chrono::Duration::minutes(30),
            deletion_grace: chrono::Duration::hours(72),
            deletion_batch_size: 100,
            operation_timeout: StdDuration::from_secs(15),
            chat_channel_type: "messaging".to_string(),
            orphan_grace: chrono::Duration::minutes(10),
        }
    }
}
