//! Integration tests for the workpulse analysis pipeline
//!
//! These drive synthetic session histories through the public API, from the
//! store adapters to the rendered report.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::{params, Connection};
use std::collections::{BTreeMap, BTreeSet};
use tempfile::TempDir;
use workpulse_core::analytics::validator::minimum_sample;
use workpulse_core::analytics::{
    ranker, render, AnalysisRequest, PatternEngine, ReportFormat, TrendGranularity,
};
use workpulse_core::config::AnalysisConfig;
use workpulse_core::{
    ConfidenceTier, DiagnosticOutcome, Error, PatternEvidence, PatternType, SessionRecord,
    SqliteSessionStore,
};

// ============================================
// Fixtures
// ============================================

fn day_zero() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn session(
    id: String,
    day: i64,
    hour: i64,
    minutes: i64,
    project: &str,
    rating: Option<u8>,
    switched: bool,
) -> SessionRecord {
    let start = day_zero() + Duration::days(day) + Duration::hours(hour);
    SessionRecord {
        id,
        project_id: Some(project.to_string()),
        start_time: start,
        end_time: start + Duration::minutes(minutes),
        productivity_rating: rating,
        energy_level: None,
        is_context_switch: switched,
    }
}

const WORK_HOURS: [i64; 8] = [8, 9, 10, 11, 13, 14, 15, 16];

/// 45 days, 8 sessions a day; the 9-11am block rates 5, everything else 2.
fn morning_peak_history() -> Vec<SessionRecord> {
    let mut sessions = Vec::new();
    for day in 0..45 {
        for hour in WORK_HOURS {
            let rating = if (9..=11).contains(&hour) { 5 } else { 2 };
            sessions.push(session(
                format!("a-{day:02}-{hour:02}"),
                day,
                hour,
                45,
                "alpha",
                Some(rating),
                false,
            ));
        }
    }
    sessions
}

/// 40 days, 3 sessions a day. The first 20 days alternate projects and rate
/// 3; the last 20 stay on one project and rate 4 or 5.
fn switching_history() -> Vec<SessionRecord> {
    let mut sessions = Vec::new();
    for day in 0..40i64 {
        for (slot, hour) in [9i64, 13, 16].into_iter().enumerate() {
            let idx = day * 3 + slot as i64;
            let (project, rating, switched) = if day < 20 {
                (if idx % 2 == 0 { "A" } else { "B" }, 3, true)
            } else {
                ("C", if idx % 2 == 0 { 4 } else { 5 }, false)
            };
            sessions.push(session(
                format!("b-{idx:03}"),
                day,
                hour,
                50,
                project,
                Some(rating),
                switched,
            ));
        }
    }
    sessions
}

fn engine() -> PatternEngine {
    PatternEngine::new(AnalysisConfig::default()).expect("default config is valid")
}

fn request_for(sessions: &[SessionRecord]) -> AnalysisRequest {
    let last = sessions
        .iter()
        .map(|s| s.end_time)
        .max()
        .expect("non-empty history");
    AnalysisRequest::new(last + Duration::hours(1))
}

// ============================================
// Detection
// ============================================

#[test]
fn morning_peak_is_detected() {
    let sessions = morning_peak_history();
    let report = engine()
        .analyze(&sessions, &request_for(&sessions))
        .expect("analysis should succeed");

    assert_eq!(report.coverage_days, 45);
    assert_eq!(report.session_count, 360);

    let peaks: Vec<_> = report.patterns_of(PatternType::PeakProductivity).collect();
    assert_eq!(peaks.len(), 1, "patterns: {:#?}", report.patterns);
    let peak = peaks[0];
    assert_eq!(peak.confidence_tier, ConfidenceTier::VeryHigh);
    match &peak.evidence {
        PatternEvidence::PeakHour {
            peak_hour,
            window_start,
            window_end,
            ..
        } => {
            assert_eq!(*peak_hour, 10);
            assert_eq!(*window_start, 9);
            assert_eq!(*window_end, 11);
        }
        other => panic!("unexpected evidence: {other:?}"),
    }
    assert!(report.insights.contains(&peak.recommendation));
}

#[test]
fn switching_projects_costs_rating_points() {
    let sessions = switching_history();
    let report = engine()
        .analyze(&sessions, &request_for(&sessions))
        .expect("analysis should succeed");

    let switches: Vec<_> = report.patterns_of(PatternType::ContextSwitchCost).collect();
    assert_eq!(switches.len(), 1, "patterns: {:#?}", report.patterns);
    let switch = switches[0];
    assert!((switch.effect_size + 1.5).abs() < 1e-9);
    assert_eq!(switch.confidence_tier, ConfidenceTier::VeryHigh);
    assert_eq!(switch.supporting_sample_size, 120);
}

#[test]
fn short_history_is_insufficient() {
    let sessions: Vec<SessionRecord> = (0..9)
        .map(|i| {
            session(
                format!("c-{i}"),
                i % 5,
                9 + i / 5,
                30,
                "alpha",
                Some(3),
                false,
            )
        })
        .collect();

    let err = engine()
        .analyze(&sessions, &request_for(&sessions))
        .unwrap_err();
    match err {
        Error::InsufficientData {
            coverage_days,
            required_days,
            session_count,
            required_sessions,
        } => {
            assert_eq!(coverage_days, 5);
            assert_eq!(required_days, 7);
            assert_eq!(session_count, 9);
            assert_eq!(required_sessions, 10);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn constant_ratings_yield_no_peak() {
    let sessions: Vec<SessionRecord> = morning_peak_history()
        .into_iter()
        .map(|mut s| {
            s.productivity_rating = Some(3);
            s
        })
        .collect();
    let report = engine()
        .analyze(&sessions, &request_for(&sessions))
        .expect("analysis should succeed");

    assert_eq!(report.patterns_of(PatternType::PeakProductivity).count(), 0);
    let peak_diagnostic = report
        .diagnostics
        .iter()
        .find(|d| d.pattern_type == PatternType::PeakProductivity)
        .expect("peak detector reports a diagnostic");
    assert!(matches!(
        peak_diagnostic.outcome,
        DiagnosticOutcome::Abstained { .. }
    ));
}

// ============================================
// Properties
// ============================================

#[test]
fn reports_are_byte_identical_across_runs() {
    let sessions = switching_history();
    let request = request_for(&sessions);
    let first = render(&engine().analyze(&sessions, &request).unwrap(), ReportFormat::Json).unwrap();
    let second =
        render(&engine().analyze(&sessions, &request).unwrap(), ReportFormat::Json).unwrap();
    assert_eq!(first, second);
}

#[test]
fn input_order_does_not_matter() {
    let sessions = morning_peak_history();
    let request = request_for(&sessions);

    let mut shuffled = sessions.clone();
    shuffled.reverse();
    shuffled.rotate_left(137);

    let expected = render(&engine().analyze(&sessions, &request).unwrap(), ReportFormat::Json);
    let actual = render(&engine().analyze(&shuffled, &request).unwrap(), ReportFormat::Json);
    assert_eq!(expected.unwrap(), actual.unwrap());
}

#[test]
fn emitted_patterns_are_significant_sampled_and_ranked() {
    for sessions in [morning_peak_history(), switching_history()] {
        let report = engine().analyze(&sessions, &request_for(&sessions)).unwrap();

        for pattern in &report.patterns {
            assert!(pattern.p_value < 0.1);
            assert!(pattern.p_value < pattern.confidence_tier.p_threshold());
            assert!(pattern.effect_size.is_finite());
            assert!(pattern.supporting_sample_size >= minimum_sample(pattern.pattern_type));
        }
        for pair in report.patterns.windows(2) {
            assert_ne!(
                ranker::compare(&pair[0], &pair[1]),
                std::cmp::Ordering::Greater
            );
        }
        assert!(report.insights.len() <= 5);
        assert!((0.0..=100.0).contains(&report.data_quality_score));
    }
}

/// 45 days of six sessions each where every field is drawn independently.
fn noise_history(seed: u64) -> Vec<SessionRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let projects = ["alpha", "beta", "gamma"];
    let mut sessions = Vec::new();
    for day in 0..45 {
        for slot in 0..6 {
            let mut record = session(
                format!("n-{day:02}-{slot}"),
                day,
                rng.gen_range(7..=20),
                rng.gen_range(15..=150),
                projects[rng.gen_range(0..projects.len())],
                Some(rng.gen_range(1..=5)),
                rng.gen_bool(0.3),
            );
            record.energy_level = Some(rng.gen_range(1..=5));
            sessions.push(record);
        }
    }
    sessions
}

#[test]
fn noise_stays_near_nominal_false_positive_rate() {
    const RUNS: u64 = 150;
    // Twice the 10% significance gate leaves room for sampling noise
    const LIMIT: usize = (RUNS as usize) / 5;

    let engine = engine();
    let mut emitted = BTreeMap::new();
    for seed in 0..RUNS {
        let sessions = noise_history(seed);
        let report = engine.analyze(&sessions, &request_for(&sessions)).unwrap();
        let types: BTreeSet<&str> = report
            .patterns
            .iter()
            .map(|p| p.pattern_type.as_str())
            .collect();
        for pattern_type in types {
            *emitted.entry(pattern_type).or_insert(0usize) += 1;
        }
    }

    for (pattern_type, count) in &emitted {
        assert!(
            *count <= LIMIT,
            "{pattern_type} emitted on {count}/{RUNS} noise datasets: {emitted:?}"
        );
    }
}

#[test]
fn min_confidence_filters_patterns() {
    let sessions = morning_peak_history();
    let request = request_for(&sessions).with_min_confidence(Some(ConfidenceTier::VeryHigh));
    let report = engine().analyze(&sessions, &request).unwrap();
    assert!(report
        .patterns
        .iter()
        .all(|p| p.confidence_tier == ConfidenceTier::VeryHigh));
}

#[test]
fn schedule_suggests_best_project_hour() {
    let sessions = morning_peak_history();
    let suggestions = engine()
        .generate_schedule_suggestions(&sessions, &request_for(&sessions))
        .unwrap();

    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].project_id, "alpha");
    assert_eq!(suggestions[0].suggested_hour, 9);
    assert_eq!(suggestions[0].confidence_tier, ConfidenceTier::VeryHigh);
}

#[test]
fn quick_insights_match_full_report() {
    let sessions = switching_history();
    let request = request_for(&sessions);
    let engine = engine();
    assert_eq!(
        engine.quick_insights(&sessions, &request).unwrap(),
        engine.analyze(&sessions, &request).unwrap().insights
    );
}

#[test]
fn weekly_trends_account_for_every_session() {
    let sessions = switching_history();
    let trends = engine()
        .trends(&sessions, &request_for(&sessions), TrendGranularity::Week)
        .unwrap();

    let total: usize = trends.points.iter().map(|p| p.sessions).sum();
    assert_eq!(total, 120);
    assert!(trends.change.is_some());
}

// ============================================
// Store adapters
// ============================================

fn write_sqlite(path: &std::path::Path, sessions: &[SessionRecord]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE sessions (
            id TEXT PRIMARY KEY,
            project_id TEXT,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            productivity_rating INTEGER,
            energy_level INTEGER,
            is_context_switch INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )
    .unwrap();
    for s in sessions {
        conn.execute(
            "INSERT INTO sessions VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                s.id,
                s.project_id,
                s.start_time.to_rfc3339(),
                s.end_time.to_rfc3339(),
                s.productivity_rating,
                s.energy_level,
                s.is_context_switch,
            ],
        )
        .unwrap();
    }
}

#[test]
fn sqlite_store_matches_in_memory_analysis() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("sessions.db");
    let sessions = switching_history();
    write_sqlite(&db_path, &sessions);

    let store = SqliteSessionStore::open(&db_path).unwrap();
    let request = request_for(&sessions);
    assert_eq!(
        engine().analyze(&store, &request).unwrap(),
        engine().analyze(&sessions, &request).unwrap()
    );
}

#[test]
fn json_input_round_trips_through_loader() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sessions.json");
    let sessions = morning_peak_history();
    std::fs::write(&path, serde_json::to_string_pretty(&sessions).unwrap()).unwrap();

    let loaded = workpulse_core::load_sessions_json(&path).unwrap();
    assert_eq!(loaded, sessions);
}
