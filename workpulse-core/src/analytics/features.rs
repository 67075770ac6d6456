//! Session feature extraction
//!
//! Turns raw [`SessionRecord`]s into [`FeatureRow`]s: the tabular view every
//! detector consumes. Rows come out in a canonical order (start time, then
//! id) so no statistic downstream depends on how the store ordered its
//! results.

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::types::SessionRecord;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc};

/// One session, reduced to the features the detectors use.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    /// Calendar date in the analysis offset
    pub local_date: NaiveDate,
    /// 0-23
    pub hour_of_day: u8,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    pub duration_minutes: f64,
    pub productivity_rating: Option<u8>,
    pub energy_level: Option<u8>,
    pub project_id: Option<String>,
    pub is_context_switch: bool,
}

impl FeatureRow {
    /// Rating as a float, for statistics.
    pub fn rating(&self) -> Option<f64> {
        self.productivity_rating.map(f64::from)
    }

    /// Energy as a float, for statistics.
    pub fn energy(&self) -> Option<f64> {
        self.energy_level.map(f64::from)
    }
}

/// Build one feature row in the given offset.
pub fn to_feature_row(session: &SessionRecord, offset: &FixedOffset) -> FeatureRow {
    let local = session.start_time.with_timezone(offset);
    FeatureRow {
        session_id: session.id.clone(),
        start_time: session.start_time,
        local_date: local.date_naive(),
        hour_of_day: local.hour() as u8,
        day_of_week: local.weekday().num_days_from_sunday() as u8,
        duration_minutes: session.duration_minutes(),
        productivity_rating: session.productivity_rating,
        energy_level: session.energy_level,
        project_id: session.project_id.clone(),
        is_context_switch: session.is_context_switch,
    }
}

/// Extract feature rows from session records.
///
/// Records violating their invariants are skipped with a warning rather
/// than repaired. Fails with [`Error::InsufficientData`] when nothing usable
/// remains.
pub fn extract_features<'a, I>(sessions: I, config: &AnalysisConfig) -> Result<Vec<FeatureRow>>
where
    I: IntoIterator<Item = &'a SessionRecord>,
{
    let offset = config.offset()?;
    let mut skipped = 0usize;

    let mut rows: Vec<FeatureRow> = sessions
        .into_iter()
        .filter(|session| match session.validation_error() {
            Some(reason) => {
                tracing::warn!(session_id = %session.id, %reason, "Skipping invalid session");
                skipped += 1;
                false
            }
            None => true,
        })
        .map(|session| to_feature_row(session, &offset))
        .collect();

    rows.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });

    tracing::debug!(rows = rows.len(), skipped, "Extracted session features");

    if rows.is_empty() {
        return Err(Error::InsufficientData {
            coverage_days: 0,
            required_days: config.quality.min_coverage_days,
            session_count: 0,
            required_sessions: config.quality.min_sessions,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, hour: u32, rating: Option<u8>) -> SessionRecord {
        // 2024-03-03 is a Sunday
        let start = Utc.with_ymd_and_hms(2024, 3, 3, hour, 30, 0).unwrap();
        SessionRecord {
            id: id.to_string(),
            project_id: Some("alpha".to_string()),
            start_time: start,
            end_time: start + chrono::Duration::minutes(45),
            productivity_rating: rating,
            energy_level: Some(3),
            is_context_switch: false,
        }
    }

    #[test]
    fn test_extracts_time_features() {
        let sessions = vec![record("a", 9, Some(4))];
        let rows = extract_features(&sessions, &AnalysisConfig::default()).unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.hour_of_day, 9);
        assert_eq!(row.day_of_week, 0);
        assert_eq!(row.duration_minutes, 45.0);
        assert_eq!(row.rating(), Some(4.0));
        assert_eq!(row.local_date, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
    }

    #[test]
    fn test_offset_shifts_hour_and_date() {
        let sessions = vec![record("a", 2, None)];
        let config = AnalysisConfig {
            utc_offset_minutes: -5 * 60,
            ..Default::default()
        };
        let rows = extract_features(&sessions, &config).unwrap();

        assert_eq!(rows[0].hour_of_day, 21);
        assert_eq!(rows[0].day_of_week, 6);
        assert_eq!(
            rows[0].local_date,
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
    }

    #[test]
    fn test_rows_sorted_canonically() {
        let sessions = vec![record("c", 15, None), record("b", 9, None), record("a", 9, None)];
        let rows = extract_features(&sessions, &AnalysisConfig::default()).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.session_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_invalid_records_skipped() {
        let mut bad = record("bad", 10, Some(9));
        bad.productivity_rating = Some(9);
        let sessions = vec![record("good", 9, Some(3)), bad];
        let rows = extract_features(&sessions, &AnalysisConfig::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].session_id, "good");
    }

    #[test]
    fn test_empty_input_is_insufficient_data() {
        let sessions: Vec<SessionRecord> = Vec::new();
        let err = extract_features(&sessions, &AnalysisConfig::default()).unwrap_err();
        match err {
            Error::InsufficientData {
                coverage_days,
                required_days,
                session_count,
                ..
            } => {
                assert_eq!(coverage_days, 0);
                assert_eq!(required_days, 7);
                assert_eq!(session_count, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
