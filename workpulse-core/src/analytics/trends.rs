//! Period-over-period activity trends.
//!
//! Buckets feature rows by local day or ISO week and summarizes each
//! bucket. The series is continuous over the analysis window: periods
//! without sessions appear with zero counts.

use super::features::FeatureRow;
use crate::error::Error;
use crate::types::AnalysisWindow;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Size of one trend period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendGranularity {
    Day,
    /// ISO week, starting Monday
    Week,
}

impl TrendGranularity {
    /// First day of the period containing `date`.
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            TrendGranularity::Day => date,
            TrendGranularity::Week => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
        }
    }

    fn step(&self) -> Duration {
        match self {
            TrendGranularity::Day => Duration::days(1),
            TrendGranularity::Week => Duration::days(7),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendGranularity::Day => "day",
            TrendGranularity::Week => "week",
        }
    }
}

impl FromStr for TrendGranularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "daily" => Ok(TrendGranularity::Day),
            "week" | "weekly" => Ok(TrendGranularity::Week),
            other => Err(Error::InvalidRequest(format!(
                "unknown trend granularity '{}' (expected day or week)",
                other
            ))),
        }
    }
}

/// Activity summary for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period_start: NaiveDate,
    pub sessions: usize,
    /// Total session minutes
    pub focus_minutes: f64,
    /// `None` when no session in the period was rated
    pub mean_rating: Option<f64>,
    /// Share of sessions that began with a project switch
    pub switch_rate: f64,
}

/// Change from the previous period to the latest one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendChange {
    pub sessions_delta_pct: f64,
    pub focus_minutes_delta_pct: f64,
    /// Rating-point difference, when both periods were rated
    pub mean_rating_delta: Option<f64>,
}

impl TrendChange {
    /// Calculate delta percentage between two values.
    pub fn calc_delta(current: f64, previous: f64) -> f64 {
        if previous == 0.0 {
            if current == 0.0 {
                0.0
            } else {
                100.0 // Growth from nothing shown as 100%
            }
        } else {
            ((current - previous) / previous) * 100.0
        }
    }

    /// Format delta for display (e.g., "+23%" or "-15%").
    pub fn format_delta(delta: f64) -> String {
        if delta >= 0.0 {
            format!("+{:.0}%", delta)
        } else {
            format!("{:.0}%", delta)
        }
    }

    fn between(previous: &TrendPoint, current: &TrendPoint) -> Self {
        Self {
            sessions_delta_pct: Self::calc_delta(
                current.sessions as f64,
                previous.sessions as f64,
            ),
            focus_minutes_delta_pct: Self::calc_delta(
                current.focus_minutes,
                previous.focus_minutes,
            ),
            mean_rating_delta: match (current.mean_rating, previous.mean_rating) {
                (Some(c), Some(p)) => Some(c - p),
                _ => None,
            },
        }
    }
}

/// A period series plus the latest change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub granularity: TrendGranularity,
    pub window: AnalysisWindow,
    pub points: Vec<TrendPoint>,
    /// `None` with fewer than two periods
    pub change: Option<TrendChange>,
}

#[derive(Default)]
struct Accumulator {
    sessions: usize,
    focus_minutes: f64,
    rating_sum: f64,
    rated: usize,
    switches: usize,
}

/// Build the trend series for `rows` over `window`.
pub fn build_trends(
    rows: &[FeatureRow],
    granularity: TrendGranularity,
    window: AnalysisWindow,
) -> TrendReport {
    let mut periods: BTreeMap<NaiveDate, Accumulator> = BTreeMap::new();

    let mut cursor = granularity.period_start(window.since);
    let last = granularity.period_start(window.until);
    while cursor <= last {
        periods.insert(cursor, Accumulator::default());
        cursor += granularity.step();
    }

    for row in rows {
        let acc = periods
            .entry(granularity.period_start(row.local_date))
            .or_default();
        acc.sessions += 1;
        acc.focus_minutes += row.duration_minutes;
        if let Some(rating) = row.rating() {
            acc.rating_sum += rating;
            acc.rated += 1;
        }
        if row.is_context_switch {
            acc.switches += 1;
        }
    }

    let points: Vec<TrendPoint> = periods
        .into_iter()
        .map(|(period_start, acc)| TrendPoint {
            period_start,
            sessions: acc.sessions,
            focus_minutes: acc.focus_minutes,
            mean_rating: (acc.rated > 0).then(|| acc.rating_sum / acc.rated as f64),
            switch_rate: if acc.sessions == 0 {
                0.0
            } else {
                acc.switches as f64 / acc.sessions as f64
            },
        })
        .collect();

    let change = match points.as_slice() {
        [.., previous, current] => Some(TrendChange::between(previous, current)),
        _ => None,
    };

    TrendReport {
        granularity,
        window,
        points,
        change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(date: NaiveDate, minutes: f64, rating: Option<u8>, switched: bool) -> FeatureRow {
        FeatureRow {
            session_id: format!("{date}-{minutes}"),
            start_time: Utc
                .from_utc_datetime(&date.and_hms_opt(9, 0, 0).unwrap()),
            local_date: date,
            hour_of_day: 9,
            day_of_week: date.weekday().num_days_from_sunday() as u8,
            duration_minutes: minutes,
            productivity_rating: rating,
            energy_level: None,
            project_id: None,
            is_context_switch: switched,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_daily_series_fills_gaps() {
        let window = AnalysisWindow {
            since: date(4),
            until: date(7),
        };
        let rows = vec![
            row(date(4), 60.0, Some(4), false),
            row(date(4), 30.0, Some(2), true),
            row(date(7), 45.0, None, false),
        ];
        let report = build_trends(&rows, TrendGranularity::Day, window);

        assert_eq!(report.points.len(), 4);
        assert_eq!(report.points[0].sessions, 2);
        assert_eq!(report.points[0].focus_minutes, 90.0);
        assert_eq!(report.points[0].mean_rating, Some(3.0));
        assert_eq!(report.points[0].switch_rate, 0.5);
        assert_eq!(report.points[1].sessions, 0);
        assert_eq!(report.points[3].mean_rating, None);

        let change = report.change.unwrap();
        assert_eq!(change.sessions_delta_pct, 100.0);
        assert_eq!(change.mean_rating_delta, None);
    }

    #[test]
    fn test_weekly_buckets_start_monday() {
        // 2024-03-04 is a Monday
        assert_eq!(TrendGranularity::Week.period_start(date(10)), date(4));
        assert_eq!(TrendGranularity::Week.period_start(date(11)), date(11));

        let window = AnalysisWindow {
            since: date(4),
            until: date(17),
        };
        let rows = vec![
            row(date(5), 60.0, Some(2), false),
            row(date(12), 60.0, Some(4), false),
            row(date(13), 60.0, Some(4), false),
        ];
        let report = build_trends(&rows, TrendGranularity::Week, window);
        assert_eq!(report.points.len(), 2);

        let change = report.change.unwrap();
        assert_eq!(change.sessions_delta_pct, 100.0);
        assert_eq!(change.focus_minutes_delta_pct, 100.0);
        assert_eq!(change.mean_rating_delta, Some(2.0));
    }

    #[test]
    fn test_granularity_parsing_and_deltas() {
        assert_eq!(
            "Weekly".parse::<TrendGranularity>().unwrap(),
            TrendGranularity::Week
        );
        assert!("monthly".parse::<TrendGranularity>().is_err());
        assert_eq!(TrendChange::calc_delta(50.0, 100.0), -50.0);
        assert_eq!(TrendChange::format_delta(23.4), "+23%");
        assert_eq!(TrendChange::format_delta(-15.0), "-15%");
    }
}
