//! View models for dashboard templates.
//! These are the typed rows the queries produce and templates render; no DB access here.

use serde::Serialize;

/// Row in the top earners table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopEarnerRow {
    pub rank: usize,
    pub author: String,
    pub total_score: f64,
    pub score_display: String,
}

/// Activity counts for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyActivityRow {
    pub created_date: String,
    pub total_items: i64,
    pub posts: i64,
    pub comments: i64,
}

/// Week-wide totals shown as metric widgets above the daily chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityTotals {
    pub total_items: i64,
    pub posts: i64,
    pub comments: i64,
    pub total_items_display: String,
    pub posts_display: String,
    pub comments_display: String,
}

impl ActivityTotals {
    pub fn from_rows(rows: &[DailyActivityRow]) -> Self {
        let total_items = rows.iter().map(|r| r.total_items).sum();
        let posts = rows.iter().map(|r| r.posts).sum();
        let comments = rows.iter().map(|r| r.comments).sum();
        Self {
            total_items,
            posts,
            comments,
            total_items_display: format_count(total_items),
            posts_display: format_count(posts),
            comments_display: format_count(comments),
        }
    }
}

/// Post flair aggregate. Posts without flair land in the `""` bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlairRow {
    pub flair: String,
    pub post_count: i64,
    pub total_adjusted_score: f64,
    pub score_display: String,
}

impl FlairRow {
    pub fn label(&self) -> &str {
        if self.flair.is_empty() {
            "(no flair)"
        } else {
            &self.flair
        }
    }
}

/// One week of a user's scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserWeekRow {
    pub moon_week: String,
    pub post_score: f64,
    pub comment_score: f64,
    pub total_score: f64,
    pub post_display: String,
    pub comment_display: String,
    pub total_display: String,
}

/// `1234567` -> `"1,234,567"`
pub fn format_count(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Scores are usually whole numbers; show decimals only when they carry information.
pub fn format_score(score: f64) -> String {
    let fixed = format!("{:.2}", score.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let grouped = int_part
        .parse::<i64>()
        .map_or_else(|_| int_part.to_string(), format_count);
    let sign = if score < 0.0 && fixed != "0.00" { "-" } else { "" };
    if frac_part == "00" {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}
