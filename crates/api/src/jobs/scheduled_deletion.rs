//! Background job that executes due user deletions.

use chrono::{DateTime, Utc};
use domain::models::deletion::DeletionRunSummary;
use domain::{MeetupCore, MeetupStore};

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::record_deletion_run;

/// Finalizes WAITING deletion schedules whose time has passed.
pub struct ScheduledDeletionJob<S: MeetupStore> {
    core: MeetupCore<S>,
    frequency: JobFrequency,
}

impl<S: MeetupStore> ScheduledDeletionJob<S> {
    pub fn new(core: MeetupCore<S>, interval_minutes: u64) -> Self {
        Self {
            core,
            frequency: JobFrequency::Minutes(interval_minutes),
        }
    }

    /// One pass treating `now` as the current time.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<DeletionRunSummary, String> {
        let summary = self
            .core
            .run_due_deletions(now)
            .await
            .map_err(|e| format!("Deletion pass failed: {}", e))?;

        record_deletion_run(&summary);
        Ok(summary)
    }
}

#[async_trait::async_trait]
impl<S: MeetupStore> Job for ScheduledDeletionJob<S> {
    fn name(&self) -> &'static str {
        "scheduled_deletion"
    }

    fn frequency(&self) -> JobFrequency {
        self.frequency
    }

    async fn execute(&self) -> Result<(), String> {
        let summary = self.run_at(Utc::now()).await?;
        if summary.failed > 0 {
            return Err(format!("{} deletions failed", summary.failed));
        }
        Ok(())
    }
}
