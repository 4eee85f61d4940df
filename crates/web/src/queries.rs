//! The dashboard's aggregation queries. All read-only, all routed through the cache.
use common::error::Result;
use common::{CachedExecutor, MoonWeek, SqlParam};

use crate::models::{format_score, DailyActivityRow, FlairRow, TopEarnerRow, UserWeekRow};

/// Leaderboard size.
pub const TOP_EARNERS_LIMIT: usize = 50;

pub const DISTINCT_WEEKS_SQL: &str = "
    SELECT DISTINCT moon_week
    FROM reddit_activity
    WHERE moon_week IS NOT NULL
    ORDER BY moon_week";

// Equal totals fall back to author order so the top 50 is deterministic.
pub const TOP_EARNERS_SQL: &str = "
    SELECT author,
           COALESCE(SUM(adjusted_score), 0) AS total_score
    FROM reddit_activity
    WHERE moon_week = ?
    GROUP BY author
    ORDER BY total_score DESC, author ASC
    LIMIT 50";

pub const DAILY_ACTIVITY_SQL: &str = "
    SELECT created_date,
           COUNT(*) AS total_items,
           SUM(CASE WHEN post_type = 'post' THEN 1 ELSE 0 END) AS posts,
           SUM(CASE WHEN post_type = 'comment' THEN 1 ELSE 0 END) AS comments
    FROM reddit_activity
    WHERE moon_week = ?
    GROUP BY created_date
    ORDER BY created_date";

pub const FLAIR_STATS_SQL: &str = "
    SELECT COALESCE(post_flair_type, '') AS flair,
           COUNT(*) AS post_count,
           COALESCE(SUM(adjusted_score), 0) AS total_adjusted_score
    FROM reddit_activity
    WHERE moon_week = ?
      AND post_type = 'post'
    GROUP BY COALESCE(post_flair_type, '')
    ORDER BY total_adjusted_score DESC, flair ASC";

pub const USER_TOTAL_SQL: &str = "
    SELECT COALESCE(SUM(adjusted_score), 0) AS total_score
    FROM reddit_activity
    WHERE author = ?";

pub const USER_WEEKS_SQL: &str = "
    SELECT moon_week,
           COALESCE(SUM(CASE WHEN post_type = 'post' THEN adjusted_score ELSE 0 END), 0) AS post_score,
           COALESCE(SUM(CASE WHEN post_type = 'comment' THEN adjusted_score ELSE 0 END), 0) AS comment_score,
           COALESCE(SUM(adjusted_score), 0) AS total_score
    FROM reddit_activity
    WHERE author = ?
    GROUP BY moon_week
    ORDER BY moon_week";

/// All known weeks, oldest first.
pub fn moon_weeks(db: &CachedExecutor) -> Result<Vec<MoonWeek>> {
    let table = db.run("distinct_weeks", DISTINCT_WEEKS_SQL, &[])?;
    (0..table.len())
        .map(|i| MoonWeek::from_cell(table.cell(i, "moon_week")?, "moon_week"))
        .collect()
}

pub fn top_earners(db: &CachedExecutor, week: &MoonWeek) -> Result<Vec<TopEarnerRow>> {
    let table = db.run("top_earners", TOP_EARNERS_SQL, &[week.as_param()])?;
    (0..table.len())
        .map(|i| {
            let total_score = table.f64(i, "total_score")?;
            Ok(TopEarnerRow {
                rank: i + 1,
                author: table.text(i, "author")?,
                total_score,
                score_display: format_score(total_score),
            })
        })
        .collect()
}

pub fn daily_activity(db: &CachedExecutor, week: &MoonWeek) -> Result<Vec<DailyActivityRow>> {
    let table = db.run("daily_activity", DAILY_ACTIVITY_SQL, &[week.as_param()])?;
    (0..table.len())
        .map(|i| {
            Ok(DailyActivityRow {
                created_date: table.text(i, "created_date")?,
                total_items: table.i64(i, "total_items")?,
                posts: table.i64(i, "posts")?,
                comments: table.i64(i, "comments")?,
            })
        })
        .collect()
}

pub fn flair_stats(db: &CachedExecutor, week: &MoonWeek) -> Result<Vec<FlairRow>> {
    let table = db.run("flair_stats", FLAIR_STATS_SQL, &[week.as_param()])?;
    (0..table.len())
        .map(|i| {
            let total_adjusted_score = table.f64(i, "total_adjusted_score")?;
            Ok(FlairRow {
                flair: table.text(i, "flair")?,
                post_count: table.i64(i, "post_count")?,
                total_adjusted_score,
                score_display: format_score(total_adjusted_score),
            })
        })
        .collect()
}

/// Adjusted score across every week; 0 for unknown users.
pub fn user_total_score(db: &CachedExecutor, username: &str) -> Result<f64> {
    let table = db.run("user_total", USER_TOTAL_SQL, &[SqlParam::from(username)])?;
    if table.is_empty() {
        return Ok(0.0);
    }
    table.f64(0, "total_score")
}

pub fn user_weekly_scores(db: &CachedExecutor, username: &str) -> Result<Vec<UserWeekRow>> {
    let table = db.run("user_weeks", USER_WEEKS_SQL, &[SqlParam::from(username)])?;
    (0..table.len())
        .map(|i| {
            let post_score = table.f64(i, "post_score")?;
            let comment_score = table.f64(i, "comment_score")?;
            let total_score = table.f64(i, "total_score")?;
            Ok(UserWeekRow {
                moon_week: table
                    .opt_text(i, "moon_week")?
                    .unwrap_or_else(|| "unassigned".to_string()),
                post_score,
                comment_score,
                total_score,
                post_display: format_score(post_score),
                comment_display: format_score(comment_score),
                total_display: format_score(total_score),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{activity, fixture_store, Activity};

    #[test]
    fn test_moon_weeks_sorted_and_distinct() {
        let (_tmp, db) = fixture_store(&[
            activity("a", Some(3), "post", 1.0),
            activity("b", Some(1), "post", 1.0),
            activity("c", Some(3), "comment", 1.0),
            activity("d", None, "comment", 1.0),
        ]);
        let weeks = moon_weeks(&db).unwrap();
        assert_eq!(weeks, vec![MoonWeek::from(1), MoonWeek::from(3)]);
    }

    #[test]
    fn test_moon_weeks_empty_store() {
        let (_tmp, db) = fixture_store(&[]);
        assert!(moon_weeks(&db).unwrap().is_empty());
    }

    #[test]
    fn test_top_earners_sums_and_orders() {
        let (_tmp, db) = fixture_store(&[
            activity("alice", Some(1), "post", 10.0),
            activity("alice", Some(1), "comment", 5.0),
            activity("bob", Some(1), "post", 20.0),
            activity("carol", Some(2), "post", 100.0),
        ]);
        let rows = top_earners(&db, &MoonWeek::from(1)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].author, "bob");
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[1].author, "alice");
        assert_eq!(rows[1].total_score, 15.0);
    }

    #[test]
    fn test_top_earners_capped_at_fifty() {
        let rows: Vec<Activity> = (0..60)
            .map(|i| activity(&format!("user{i:02}"), Some(1), "comment", f64::from(i)))
            .collect();
        let (_tmp, db) = fixture_store(&rows);
        let top = top_earners(&db, &MoonWeek::from(1)).unwrap();
        assert_eq!(top.len(), TOP_EARNERS_LIMIT);
        assert_eq!(top[0].author, "user59");
        assert!(top
            .windows(2)
            .all(|w| w[0].total_score >= w[1].total_score));
    }

    #[test]
    fn test_top_earners_ties_break_by_author() {
        let (_tmp, db) = fixture_store(&[
            activity("zed", Some(1), "post", 7.0),
            activity("amy", Some(1), "post", 7.0),
            activity("max", Some(1), "post", 7.0),
        ]);
        let authors: Vec<String> = top_earners(&db, &MoonWeek::from(1))
            .unwrap()
            .into_iter()
            .map(|r| r.author)
            .collect();
        assert_eq!(authors, vec!["amy", "max", "zed"]);
    }

    #[test]
    fn test_daily_activity_posts_plus_comments_is_total() {
        let (_tmp, db) = fixture_store(&[
            activity("a", Some(1), "post", 1.0).on("2024-01-02"),
            activity("b", Some(1), "comment", 1.0).on("2024-01-01"),
            activity("c", Some(1), "comment", 1.0).on("2024-01-02"),
            activity("d", Some(1), "comment", 1.0).on("2024-01-02"),
            activity("e", Some(2), "post", 1.0).on("2024-01-09"),
        ]);
        let rows = daily_activity(&db, &MoonWeek::from(1)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].created_date, "2024-01-01");
        assert_eq!(rows[1].total_items, 3);
        assert_eq!(rows[1].posts, 1);
        assert_eq!(rows[1].comments, 2);
        for row in &rows {
            assert_eq!(row.posts + row.comments, row.total_items);
        }
    }

    #[test]
    fn test_flair_stats_posts_only_and_null_bucket() {
        let (_tmp, db) = fixture_store(&[
            activity("a", Some(1), "post", 10.0).flair("NEWS"),
            activity("b", Some(1), "post", 4.0).flair("NEWS"),
            activity("c", Some(1), "post", 30.0),
            activity("d", Some(1), "post", 1.0).flair(""),
            activity("e", Some(1), "comment", 500.0).flair("NEWS"),
        ]);
        let rows = flair_stats(&db, &MoonWeek::from(1)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].flair, "");
        assert_eq!(rows[0].post_count, 2);
        assert_eq!(rows[0].total_adjusted_score, 31.0);
        assert_eq!(rows[1].flair, "NEWS");
        assert_eq!(rows[1].post_count, 2);
        assert_eq!(rows[1].total_adjusted_score, 14.0);
    }

    #[test]
    fn test_flair_stats_empty_when_only_comments() {
        let (_tmp, db) = fixture_store(&[activity("a", Some(1), "comment", 3.0)]);
        assert!(flair_stats(&db, &MoonWeek::from(1)).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_user_scores_zero() {
        let (_tmp, db) = fixture_store(&[activity("alice", Some(1), "post", 3.0)]);
        assert_eq!(user_total_score(&db, "nobody").unwrap(), 0.0);
        assert!(user_weekly_scores(&db, "nobody").unwrap().is_empty());
    }

    #[test]
    fn test_user_weekly_breakdown() {
        let (_tmp, db) = fixture_store(&[
            activity("alice", Some(2), "post", 10.0),
            activity("alice", Some(1), "post", 3.0),
            activity("alice", Some(1), "comment", 2.0),
            activity("alice", None, "comment", 1.0),
            activity("bob", Some(1), "post", 99.0),
        ]);
        assert_eq!(user_total_score(&db, "alice").unwrap(), 16.0);

        let weeks = user_weekly_scores(&db, "alice").unwrap();
        let labels: Vec<&str> = weeks.iter().map(|w| w.moon_week.as_str()).collect();
        assert_eq!(labels, vec!["unassigned", "1", "2"]);
        assert_eq!(weeks[1].post_score, 3.0);
        assert_eq!(weeks[1].comment_score, 2.0);
        assert_eq!(weeks[1].total_score, 5.0);
    }
}
