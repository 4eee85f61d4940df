//! Builds the dashboard's render tree from the store and the selected filters.
//!
//! Everything here is a single top-to-bottom pass with no widget calls, so the
//! whole page can be asserted on in tests and serialized for `/api/page`.

use common::error::Result;
use common::{CachedExecutor, MoonWeek};
use serde::{Deserialize, Serialize};

use crate::charts::{BarChart, LineChart};
use crate::models::{
    format_score, ActivityTotals, DailyActivityRow, FlairRow, TopEarnerRow, UserWeekRow,
};
use crate::queries;

pub const NO_LEADERBOARD_DATA: &str = "No data for this Moon Week yet.";
pub const NO_DAILY_DATA: &str = "No daily data for this Moon Week.";
pub const NO_FLAIR_DATA: &str = "No posts with flair found for this Moon Week.";
pub const NO_USER_DATA: &str = "No entries found for this user in the database.";
pub const USER_PROMPT: &str = "Enter a username in the sidebar to look up their scores.";
pub const NO_WEEKS: &str = "No Moon Weeks found in the database yet.";

/// Sidebar inputs, straight from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Filters {
    pub week: Option<String>,
    pub user: Option<String>,
}

impl Filters {
    /// Trimmed username, or `None` when nothing usable was entered.
    pub fn username(&self) -> Option<&str> {
        self.user
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Page {
    /// The database file is missing; nothing else can be shown.
    StoreMissing { path: String },
    /// The store exists but holds no Moon Weeks yet.
    NoWeeks { db_label: String },
    Dashboard(Box<DashboardView>),
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekOption {
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub db_label: String,
    pub weeks: Vec<WeekOption>,
    pub selected_week: String,
    pub username_input: String,
    pub leaderboard: Section<Leaderboard>,
    pub daily: Section<DailyActivity>,
    pub flair: Section<FlairStats>,
    pub user: UserPanel,
}

/// A titled block that either has data or shows `notice` instead.
#[derive(Debug, Clone, Serialize)]
pub struct Section<T> {
    pub title: String,
    pub data: Option<T>,
    pub notice: String,
}

impl<T> Section<T> {
    fn new(title: String, data: Option<T>, notice: &str) -> Self {
        Self {
            title,
            data,
            notice: notice.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub rows: Vec<TopEarnerRow>,
    pub chart: BarChart,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyActivity {
    pub rows: Vec<DailyActivityRow>,
    pub totals: ActivityTotals,
    pub chart: LineChart,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlairStats {
    pub rows: Vec<FlairRow>,
    pub chart: BarChart,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPanel {
    pub prompt: String,
    pub lookup: Option<UserLookup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserLookup {
    pub username: String,
    pub overall_score: f64,
    pub overall_display: String,
    pub weeks: Section<UserWeeks>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserWeeks {
    pub rows: Vec<UserWeekRow>,
    pub chart: BarChart,
}

/// Resolve the requested week against the known ones; default is the latest.
fn select_week<'a>(weeks: &'a [MoonWeek], requested: Option<&str>) -> Option<&'a MoonWeek> {
    requested
        .and_then(|r| weeks.iter().find(|w| w.to_string() == r.trim()))
        .or_else(|| weeks.last())
}

pub fn build_page(db: &CachedExecutor, filters: &Filters) -> Result<Page> {
    if !db.store_exists() {
        tracing::error!(path = %db.location().display(), "database file not found");
        return Ok(Page::StoreMissing {
            path: db.location().display().to_string(),
        });
    }
    let db_label = db.location().display().to_string();

    let weeks = queries::moon_weeks(db)?;
    let Some(week) = select_week(&weeks, filters.week.as_deref()) else {
        tracing::warn!("no moon weeks in store");
        return Ok(Page::NoWeeks { db_label });
    };
    let selected_week = week.to_string();
    if filters.week.as_deref().is_some_and(|w| w.trim() != selected_week) {
        tracing::debug!(
            requested = ?filters.week,
            selected = %selected_week,
            "unknown week requested; using latest"
        );
    }

    let leaderboard = leaderboard_section(db, week)?;
    let daily = daily_section(db, week)?;
    let flair = flair_section(db, week)?;
    let user = user_panel(db, filters.username())?;

    tracing::info!(
        week = %selected_week,
        leaders = leaderboard.data.as_ref().map_or(0, |d| d.rows.len()),
        days = daily.data.as_ref().map_or(0, |d| d.rows.len()),
        flairs = flair.data.as_ref().map_or(0, |d| d.rows.len()),
        user_lookup = user.lookup.is_some(),
        "dashboard built"
    );

    let week_options = weeks
        .iter()
        .map(|w| {
            let label = w.to_string();
            WeekOption {
                selected: label == selected_week,
                label,
            }
        })
        .collect();

    Ok(Page::Dashboard(Box::new(DashboardView {
        db_label,
        weeks: week_options,
        selected_week,
        username_input: filters.user.clone().unwrap_or_default(),
        leaderboard,
        daily,
        flair,
        user,
    })))
}

fn leaderboard_section(db: &CachedExecutor, week: &MoonWeek) -> Result<Section<Leaderboard>> {
    let rows = queries::top_earners(db, week)?;
    let data = (!rows.is_empty()).then(|| {
        let chart = BarChart::new(
            &["Total Score"],
            rows.iter()
                .map(|r| (r.author.clone(), vec![(r.total_score, r.score_display.clone())]))
                .collect(),
        );
        Leaderboard { rows, chart }
    });
    Ok(Section::new(
        format!(
            "Top {} Adjusted Score Earners – Moon Week {week}",
            queries::TOP_EARNERS_LIMIT
        ),
        data,
        NO_LEADERBOARD_DATA,
    ))
}

fn daily_section(db: &CachedExecutor, week: &MoonWeek) -> Result<Section<DailyActivity>> {
    let rows = queries::daily_activity(db, week)?;
    let data = (!rows.is_empty()).then(|| {
        let dates: Vec<String> = rows.iter().map(|r| r.created_date.clone()).collect();
        let chart = LineChart::new(
            &dates,
            &[
                ("posts", rows.iter().map(|r| r.posts).collect()),
                ("comments", rows.iter().map(|r| r.comments).collect()),
            ],
        );
        DailyActivity {
            totals: ActivityTotals::from_rows(&rows),
            rows,
            chart,
        }
    });
    Ok(Section::new(
        format!("Daily Activity – Moon Week {week}"),
        data,
        NO_DAILY_DATA,
    ))
}

fn flair_section(db: &CachedExecutor, week: &MoonWeek) -> Result<Section<FlairStats>> {
    let rows = queries::flair_stats(db, week)?;
    let data = (!rows.is_empty()).then(|| {
        #[allow(clippy::cast_precision_loss)]
        let chart = BarChart::new(
            &["Post Count", "Total Adjusted Score"],
            rows.iter()
                .map(|r| {
                    (
                        r.label().to_string(),
                        vec![
                            (r.post_count as f64, r.post_count.to_string()),
                            (r.total_adjusted_score, r.score_display.clone()),
                        ],
                    )
                })
                .collect(),
        );
        FlairStats { rows, chart }
    });
    Ok(Section::new(
        format!("Post Flair Stats – Moon Week {week}"),
        data,
        NO_FLAIR_DATA,
    ))
}

fn user_panel(db: &CachedExecutor, username: Option<&str>) -> Result<UserPanel> {
    let Some(username) = username else {
        return Ok(UserPanel {
            prompt: USER_PROMPT.to_string(),
            lookup: None,
        });
    };

    let overall_score = queries::user_total_score(db, username)?;
    let rows = queries::user_weekly_scores(db, username)?;
    let data = (!rows.is_empty()).then(|| {
        let chart = BarChart::new(
            &["Post Score", "Comment Score"],
            rows.iter()
                .map(|r| {
                    (
                        r.moon_week.clone(),
                        vec![
                            (r.post_score, r.post_display.clone()),
                            (r.comment_score, r.comment_display.clone()),
                        ],
                    )
                })
                .collect(),
        );
        UserWeeks { rows, chart }
    });

    Ok(UserPanel {
        prompt: String::new(),
        lookup: Some(UserLookup {
            username: username.to_string(),
            overall_score,
            overall_display: format_score(overall_score),
            weeks: Section::new(format!("Results for u/{username}"), data, NO_USER_DATA),
        }),
    })
}
