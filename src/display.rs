use serde::Serialize;

use crate::aggregate::{XgStats, round2};
use crate::match_xg::MatchXg;

pub const BAND_HIGH: f64 = 0.15;
pub const BAND_MEDIUM: f64 = 0.05;

const MINUS_SIGN: char = '\u{2212}';

pub fn format_xg(v: f64) -> String {
    format!("{:.2}", round2(v))
}

// Negative values use U+2212; zero carries no sign.
pub fn format_overperformance(v: f64) -> String {
    let r = round2(v);
    if r > 0.0 {
        format!("+{r:.2}")
    } else if r < 0.0 {
        format!("{MINUS_SIGN}{:.2}", -r)
    } else {
        "0.00".to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum XgBand {
    High,
    Medium,
    Low,
}

impl XgBand {
    pub fn from_xg(xg: f64) -> Self {
        if xg >= BAND_HIGH {
            Self::High
        } else if xg >= BAND_MEDIUM {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsRow {
    pub label: String,
    pub total_xg: String,
    pub shots: String,
    pub goals: String,
    pub overperformance: String,
    pub xg_per_shot: String,
    pub band: XgBand,
}

impl StatsRow {
    pub fn from_stats(label: impl Into<String>, stats: &XgStats) -> Self {
        Self {
            label: label.into(),
            total_xg: format_xg(stats.total_xg),
            shots: stats.shot_count.to_string(),
            goals: stats.actual_goals.to_string(),
            overperformance: format_overperformance(stats.overperformance),
            xg_per_shot: format_xg(stats.xg_per_shot),
            band: XgBand::from_xg(stats.xg_per_shot),
        }
    }
}

pub fn match_rows(result: &MatchXg, home_label: &str, away_label: &str) -> [StatsRow; 2] {
    [
        StatsRow::from_stats(home_label, &result.home.stats),
        StatsRow::from_stats(away_label, &result.away.stats),
    ]
}
