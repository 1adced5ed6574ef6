//! Background job that deletes chat channels nothing points at anymore.

use chrono::{DateTime, Utc};
use domain::services::ReconcileReport;
use domain::{MeetupCore, MeetupStore};

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::record_reconcile_report;

/// Resolves recorded orphan channels and sweeps stale unbound ones.
pub struct OrphanChannelsJob<S: MeetupStore> {
    core: MeetupCore<S>,
    frequency: JobFrequency,
}

impl<S: MeetupStore> OrphanChannelsJob<S> {
    pub fn new(core: MeetupCore<S>, interval_minutes: u64) -> Self {
        Self {
            core,
            frequency: JobFrequency::Minutes(interval_minutes),
        }
    }

    /// One pass treating `now` as the current time.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<ReconcileReport, String> {
        let report = self
            .core
            .reconcile_chat_channels(now)
            .await
            .map_err(|e| format!("Channel reconciliation failed: {}", e))?;

        record_reconcile_report(&report);
        Ok(report)
    }
}

#[async_trait::async_trait]
impl<S: MeetupStore> Job for OrphanChannelsJob<S> {
    fn name(&self) -> &'static str {
        "orphan_channels"
    }

    fn frequency(&self) -> JobFrequency {
        self.frequency
    }

    async fn execute(&self) -> Result<(), String> {
        // Failed deletes stay recorded and are retried next pass.
        self.run_at(Utc::now()).await.map(|_| ())
    }
}
