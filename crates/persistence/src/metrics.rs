//! Database metrics.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::{Duration, Instant};

/// Histogram of query durations, labelled by query name.
pub const QUERY_DURATION_METRIC: &str = "db_query_duration_seconds";

/// Record how long a named query took.
pub fn record_query_duration(query_name: &'static str, duration: Duration) {
    histogram!(QUERY_DURATION_METRIC, "query" => query_name).record(duration.as_secs_f64());
}

/// Publish connection pool gauges. Called when metrics are scraped.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("db_pool_connections_total").set(size as f64);
    gauge!("db_pool_connections_idle").set(idle as f64);
    gauge!("db_pool_connections_active").set(size.saturating_sub(idle) as f64);
}

/// Times one repository query.
///
/// ```ignore
/// let timer = QueryTimer::new("count_log_records");
/// let result = query.fetch_one(&pool).await;
/// timer.record();
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

    /// Record the elapsed time and return it.
    pub fn record(self) -> Duration {
        let elapsed = self.start.elapsed();
        record_query_duration(self.query_name, elapsed);
        elapsed
    }
}
