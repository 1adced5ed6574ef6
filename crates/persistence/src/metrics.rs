//! Database metrics collection.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record database query duration.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Count a write rejected by a constraint, labelled by constraint name.
pub fn record_constraint_violation(kind: &'static str, constraint: &str) {
    counter!(
        "database_constraint_violations_total",
        "kind" => kind,
        "constraint" => constraint.to_string()
    )
    .increment(1);
}

/// Record database connection pool metrics.
///
/// Call this function periodically to track pool health.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active").set(active as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times one repository query.
///
/// ```ignore
/// let timer = QueryTimer::new("lock_match_request_by_id");
/// let result = sqlx::query_as::<_, MatchRequestEntity>(...).fetch_optional(&mut *conn).await;
/// timer.record();
/// result
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration to metrics.
    pub fn record(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_query_duration(self.query_name, duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_timer_keeps_name() {
        let timer = QueryTimer::new("find_user_by_id");
        assert_eq!(timer.query_name, "find_user_by_id");
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        QueryTimer::new("list_due_deletion_schedules").record();
        record_constraint_violation("unique", "idx_match_requests_open_pair");
    }
}
