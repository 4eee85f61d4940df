//! Fixture stores for tests: a temp SQLite file shaped like the ingestion output.
use std::sync::Arc;

use common::db::FIXTURE_SCHEMA;
use common::{CachedExecutor, NoCache, SqliteExecutor};
use rusqlite::{params, Connection};
use tempfile::NamedTempFile;

#[derive(Debug, Clone)]
pub struct Activity {
    pub author: String,
    pub moon_week: Option<i64>,
    pub created_date: String,
    pub post_type: &'static str,
    pub adjusted_score: f64,
    pub post_flair_type: Option<String>,
}

pub fn activity(author: &str, week: Option<i64>, post_type: &'static str, score: f64) -> Activity {
    Activity {
        author: author.to_string(),
        moon_week: week,
        created_date: "2024-01-01".to_string(),
        post_type,
        adjusted_score: score,
        post_flair_type: None,
    }
}

impl Activity {
    pub fn on(mut self, date: &str) -> Self {
        self.created_date = date.to_string();
        self
    }

    pub fn flair(mut self, flair: &str) -> Self {
        self.post_flair_type = Some(flair.to_string());
        self
    }
}

pub fn write_store(path: &std::path::Path, rows: &[Activity]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(FIXTURE_SCHEMA).unwrap();
    for r in rows {
        conn.execute(
            "INSERT INTO reddit_activity
                 (author, moon_week, created_date, post_type, adjusted_score, post_flair_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                r.author,
                r.moon_week,
                r.created_date,
                r.post_type,
                r.adjusted_score,
                r.post_flair_type
            ],
        )
        .unwrap();
    }
}

/// Temp store plus an uncached executor over it. Keep the file handle alive.
pub fn fixture_store(rows: &[Activity]) -> (NamedTempFile, CachedExecutor) {
    let tmp = NamedTempFile::new().unwrap();
    write_store(tmp.path(), rows);
    let db = CachedExecutor::new(
        Arc::new(SqliteExecutor::new(tmp.path())),
        Arc::new(NoCache),
    );
    (tmp, db)
}
