//! Chart geometry. Templates only place what is computed here: bar widths as
//! percentages and SVG polyline coordinates.

use chrono::NaiveDate;
use serde::Serialize;

/// Tailwind classes per series, in order.
const SERIES_COLORS: [&str; 2] = ["bg-amber-400", "bg-sky-400"];
const SERIES_STROKES: [&str; 2] = ["stroke-amber-400", "stroke-sky-400"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub value_display: String,
    /// Width in percent of the widest bar in the chart, e.g. `"42.0"`.
    pub width_pct: String,
    pub negative: bool,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarGroup {
    pub label: String,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub name: String,
    pub color: String,
}

/// Horizontal bar chart; one group per category, one bar per series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub legend: Vec<Legend>,
    pub groups: Vec<BarGroup>,
}

impl BarChart {
    /// `series` names the values carried by each category, in the same order.
    pub fn new(series: &[&str], categories: Vec<(String, Vec<(f64, String)>)>) -> Self {
        let max_abs = categories
            .iter()
            .flat_map(|(_, values)| values.iter().map(|(v, _)| v.abs()))
            .fold(0.0_f64, f64::max);

        let groups = categories
            .into_iter()
            .map(|(label, values)| BarGroup {
                label,
                bars: values
                    .into_iter()
                    .enumerate()
                    .map(|(i, (value, value_display))| Bar {
                        value_display,
                        width_pct: format!("{:.1}", percent_of(value.abs(), max_abs)),
                        negative: value < 0.0,
                        color: SERIES_COLORS[i % SERIES_COLORS.len()].to_string(),
                    })
                    .collect(),
            })
            .collect();

        let legend = series
            .iter()
            .enumerate()
            .map(|(i, name)| Legend {
                name: (*name).to_string(),
                color: SERIES_COLORS[i % SERIES_COLORS.len()].to_string(),
            })
            .collect();

        Self { legend, groups }
    }
}

fn percent_of(value: f64, max: f64) -> f64 {
    if max <= 0.0 {
        0.0
    } else {
        value / max * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub name: String,
    pub stroke: String,
    pub color: String,
    /// SVG `points` attribute.
    pub points: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisLabel {
    pub x: String,
    pub text: String,
}

/// Line chart over a categorical x axis (dates).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub width: u32,
    pub height: u32,
    pub series: Vec<LineSeries>,
    pub x_labels: Vec<AxisLabel>,
    pub y_max_display: String,
    pub baseline_y: String,
}

const LINE_WIDTH: u32 = 720;
const LINE_HEIGHT: u32 = 240;
const LINE_PAD: f64 = 24.0;

impl LineChart {
    /// `x` holds one label per point; each series must have `x.len()` values.
    pub fn new(x: &[String], series: &[(&str, Vec<i64>)]) -> Self {
        let w = f64::from(LINE_WIDTH);
        let h = f64::from(LINE_HEIGHT);
        let y_max = series
            .iter()
            .flat_map(|(_, values)| values.iter().copied())
            .max()
            .unwrap_or(0)
            .max(0);

        let x_at = |i: usize| -> f64 {
            if x.len() <= 1 {
                w / 2.0
            } else {
                #[allow(clippy::cast_precision_loss)]
                let step = (w - 2.0 * LINE_PAD) / (x.len() - 1) as f64;
                #[allow(clippy::cast_precision_loss)]
                let offset = step * i as f64;
                LINE_PAD + offset
            }
        };
        let y_at = |v: i64| -> f64 {
            #[allow(clippy::cast_precision_loss)]
            let frac = percent_of(v as f64, y_max as f64) / 100.0;
            h - LINE_PAD - frac * (h - 2.0 * LINE_PAD)
        };

        let series = series
            .iter()
            .enumerate()
            .map(|(si, (name, values))| LineSeries {
                name: (*name).to_string(),
                stroke: SERIES_STROKES[si % SERIES_STROKES.len()].to_string(),
                color: SERIES_COLORS[si % SERIES_COLORS.len()].to_string(),
                points: values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| format!("{:.1},{:.1}", x_at(i), y_at(*v)))
                    .collect::<Vec<_>>()
                    .join(" "),
            })
            .collect();

        let x_labels = x
            .iter()
            .enumerate()
            .map(|(i, label)| AxisLabel {
                x: format!("{:.1}", x_at(i)),
                text: short_date(label),
            })
            .collect();

        Self {
            width: LINE_WIDTH,
            height: LINE_HEIGHT,
            series,
            x_labels,
            y_max_display: crate::models::format_count(y_max),
            baseline_y: format!("{:.1}", h - LINE_PAD),
        }
    }
}

/// `2024-01-05` -> `Jan 05`; anything unparseable is shown as stored.
fn short_date(raw: &str) -> String {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_or_else(|_| raw.to_string(), |d| d.format("%b %d").to_string())
}
