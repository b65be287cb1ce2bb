//! Query and pool metrics for the PostgreSQL stores.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// PostgreSQL error code for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Outcome label for a finished query.
pub fn query_outcome<T>(result: &Result<T, sqlx::Error>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(sqlx::Error::Database(db_err))
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
        {
            "conflict"
        }
        Err(sqlx::Error::RowNotFound) => "not_found",
        Err(_) => "error",
    }
}

/// Snapshot of pool usage. Sampled on every health check.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("store_pool_connections", "state" => "active").set(size.saturating_sub(idle) as f64);
    gauge!("store_pool_connections", "state" => "idle").set(idle as f64);
}

/// Times one store query.
///
/// ```ignore
/// let timer = QueryTimer::new("find_request_by_id");
/// let result = sqlx::query_as::<_, RequestEntity>(...).fetch_optional(&pool).await;
/// timer.record(&result);
/// ```
pub struct QueryTimer {
    query: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query: &'static str) -> Self {
        Self {
            query,
            start: Instant::now(),
        }
    }

    /// Records the duration labelled with the query and its outcome.
    /// Unique violations are also counted, since the services rely on them
    /// to detect concurrent writers.
    pub fn record<T>(self, result: &Result<T, sqlx::Error>) {
        let outcome = query_outcome(result);
        histogram!(
            "store_query_duration_seconds",
            "query" => self.query,
            "outcome" => outcome
        )
        .record(self.start.elapsed().as_secs_f64());

        if outcome == "conflict" {
            counter!("store_unique_conflicts_total", "query" => self.query).increment(1);
        }
    }
}
