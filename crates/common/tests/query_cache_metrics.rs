use std::sync::Arc;
use std::time::Duration;

use common::db::FIXTURE_SCHEMA;
use common::{CachedExecutor, SqlParam, SqliteExecutor, TtlCache};
use metrics_exporter_prometheus::PrometheusBuilder;

fn store_with_rows() -> tempfile::NamedTempFile {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let conn = rusqlite::Connection::open(tmp.path()).unwrap();
    conn.execute_batch(FIXTURE_SCHEMA).unwrap();
    conn.execute(
        "INSERT INTO reddit_activity (author, moon_week, created_date, post_type, adjusted_score)
         VALUES ('alice', 1, '2024-01-01', 'post', 5)",
        [],
    )
    .unwrap();
    tmp
}

#[test]
fn cached_executor_records_hits_misses_and_latency() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let tmp = store_with_rows();

    metrics::with_local_recorder(&recorder, || {
        let db = CachedExecutor::new(
            Arc::new(SqliteExecutor::new(tmp.path())),
            Arc::new(TtlCache::new(Duration::from_secs(300), 16)),
        );
        let sql = "SELECT SUM(adjusted_score) AS total FROM reddit_activity WHERE moon_week = ?";

        let first = db.run("test.sum", sql, &[SqlParam::Int(1)]).unwrap();
        let second = db.run("test.sum", sql, &[SqlParam::Int(1)]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.f64(0, "total").unwrap(), 5.0);

        // Errors count against the query and are not cached.
        assert!(db
            .run("test.err", "SELECT * FROM definitely_missing_table", &[])
            .is_err());
    });

    let rendered = handle.render();
    for expected in [
        "moon_query_latency_ms",
        "moon_query_errors_total",
        "moon_cache_requests_total",
        "result=\"hit\"",
        "result=\"miss\"",
    ] {
        assert!(
            rendered.contains(expected),
            "expected {expected} in rendered metrics, got:\n{rendered}"
        );
    }
}

#[test]
fn cached_result_survives_store_changes_until_expiry() {
    let tmp = store_with_rows();
    let db = CachedExecutor::new(
        Arc::new(SqliteExecutor::new(tmp.path())),
        Arc::new(TtlCache::new(Duration::from_millis(100), 16)),
    );
    let sql = "SELECT COUNT(*) AS n FROM reddit_activity";
    assert_eq!(db.run("count", sql, &[]).unwrap().i64(0, "n").unwrap(), 1);

    let conn = rusqlite::Connection::open(tmp.path()).unwrap();
    conn.execute(
        "INSERT INTO reddit_activity (author, moon_week, created_date, post_type, adjusted_score)
         VALUES ('bob', 1, '2024-01-02', 'comment', 1)",
        [],
    )
    .unwrap();
    drop(conn);

    // Stale within the TTL window.
    assert_eq!(db.run("count", sql, &[]).unwrap().i64(0, "n").unwrap(), 1);

    std::thread::sleep(Duration::from_millis(250));
    assert_eq!(db.run("count", sql, &[]).unwrap().i64(0, "n").unwrap(), 2);
}
