//! Memoization of query results.
//!
//! The presentation layer never talks to an executor directly; it goes through
//! [`CachedExecutor`], which consults a [`ResultCache`] keyed by the exact SQL
//! text and parameter tuple. Entries only leave the cache by expiring, so a
//! result may be up to one TTL stale.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;

use crate::db::QueryExecutor;
use crate::error::{Result, StoreError};
use crate::table::{SqlParam, Table};

/// Default lifetime of a cached result.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl QueryKey {
    pub fn new(sql: &str, params: &[SqlParam]) -> Self {
        Self {
            sql: sql.to_string(),
            params: params.to_vec(),
        }
    }
}

/// Get-or-compute store for materialized tables.
///
/// `compute` runs only on a miss. Failures are returned to the caller and
/// never stored.
pub trait ResultCache: Send + Sync {
    fn get_or_compute(
        &self,
        key: QueryKey,
        compute: &mut dyn FnMut() -> Result<Table>,
    ) -> Result<Arc<Table>>;
}

/// Time-to-live cache backed by moka.
///
/// Concurrent misses on one key are coalesced: a single caller runs `compute`
/// and the others wait for its result.
pub struct TtlCache {
    inner: Cache<QueryKey, Arc<Table>>,
}

impl TtlCache {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }
}

impl ResultCache for TtlCache {
    fn get_or_compute(
        &self,
        key: QueryKey,
        compute: &mut dyn FnMut() -> Result<Table>,
    ) -> Result<Arc<Table>> {
        let mut computed = false;
        let res = self.inner.try_get_with(key, || {
            computed = true;
            compute().map(Arc::new)
        });

        let result = if computed { "miss" } else { "hit" };
        metrics::counter!("moon_cache_requests_total", "result" => result).increment(1);

        res.map_err(|e| Arc::try_unwrap(e).unwrap_or_else(StoreError::Shared))
    }
}

/// Pass-through used when caching is switched off.
pub struct NoCache;

impl ResultCache for NoCache {
    fn get_or_compute(
        &self,
        _key: QueryKey,
        compute: &mut dyn FnMut() -> Result<Table>,
    ) -> Result<Arc<Table>> {
        metrics::counter!("moon_cache_requests_total", "result" => "bypass").increment(1);
        compute().map(Arc::new)
    }
}

/// An executor fronted by a cache. Cheap to clone.
#[derive(Clone)]
pub struct CachedExecutor {
    executor: Arc<dyn QueryExecutor>,
    cache: Arc<dyn ResultCache>,
}

impl CachedExecutor {
    pub fn new(executor: Arc<dyn QueryExecutor>, cache: Arc<dyn ResultCache>) -> Self {
        Self { executor, cache }
    }

    /// Run `sql` through the cache. `op` names the query in metrics and logs.
    pub fn run(&self, op: &'static str, sql: &str, params: &[SqlParam]) -> Result<Arc<Table>> {
        let key = QueryKey::new(sql, params);
        let executor = &self.executor;
        self.cache.get_or_compute(key, &mut || {
            let start = Instant::now();
            let res = executor.execute(sql, params);
            let ms = start.elapsed().as_secs_f64() * 1000.0;

            match &res {
                Ok(table) => {
                    metrics::histogram!("moon_query_latency_ms", "query" => op, "status" => "ok")
                        .record(ms);
                    tracing::debug!(query = op, rows = table.len(), ms, "store query");
                }
                Err(e) => {
                    metrics::histogram!("moon_query_latency_ms", "query" => op, "status" => "err")
                        .record(ms);
                    metrics::counter!("moon_query_errors_total", "query" => op).increment(1);
                    tracing::warn!(query = op, error = %e, "store query failed");
                }
            }
            res
        })
    }

    pub fn store_exists(&self) -> bool {
        self.executor.store_exists()
    }

    pub fn location(&self) -> &Path {
        self.executor.location()
    }
}
