//! Background job scheduler and job implementations.

mod orphan_channels;
mod pool_metrics;
mod scheduled_deletion;
mod scheduler;

pub use orphan_channels::OrphanChannelsJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduled_deletion::ScheduledDeletionJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
