//! Pattern detectors
//!
//! Each detector lives in its own module and implements [`PatternDetector`].
//! Detectors are pure functions of the feature rows and the analysis
//! configuration; they never see each other's results, so the engine is free
//! to run them in parallel.
//!
//! ## Built-in Detectors
//!
//! | Detector | Pattern | Test |
//! |----------|---------|------|
//! | [`peak`] | `peak_productivity` | Welch t, hour plateau vs rest |
//! | [`deep_work`] | `deep_work_window` | Welch t, long vs short sessions |
//! | [`context_switch`] | `context_switch_cost` | Welch t, switched vs consecutive |
//! | [`rhythm`] | `work_rhythm` | k-means + one-way ANOVA |
//! | [`affinity`] | `project_affinity` | Welch t, project/daypart vs rest |
//! | [`energy`] | `energy_correlation` | Pearson r |
//!
//! A detector with nothing to say returns [`DetectorOutcome::Abstained`].
//! That is not an error and is reported separately from candidates that
//! were tested and failed validation.

pub mod affinity;
pub mod context_switch;
pub mod deep_work;
pub mod energy;
pub mod peak;
pub mod rhythm;

use super::features::FeatureRow;
use crate::config::AnalysisConfig;
use crate::types::{PatternEvidence, PatternType};

/// Read-only inputs shared by every detector in a run.
pub struct DetectorContext<'a> {
    pub config: &'a AnalysisConfig,
}

/// An unvalidated pattern proposed by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub pattern_type: PatternType,
    pub description: String,
    pub p_value: f64,
    pub effect_size: f64,
    pub supporting_sample_size: usize,
    pub recommendation: String,
    pub evidence: PatternEvidence,
}

/// What a detector produced.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorOutcome {
    /// One or more candidates to validate
    Found(Vec<Candidate>),
    /// Nothing testable in this data; the reason is for diagnostics
    Abstained(String),
}

impl DetectorOutcome {
    pub fn abstain(reason: impl Into<String>) -> Self {
        DetectorOutcome::Abstained(reason.into())
    }
}

/// Trait implemented by all pattern detectors.
///
/// Detectors should be:
/// - **Deterministic**: identical rows give identical candidates
/// - **Total**: internal failures degrade to an abstention, never a panic
/// - **Honest**: no candidate without a real test behind it
pub trait PatternDetector: Send + Sync {
    /// Unique name, `namespace.detector` (e.g. "core.peak_productivity").
    fn name(&self) -> &str;

    /// The pattern type this detector emits.
    fn pattern_type(&self) -> PatternType;

    /// Inspect the rows and propose candidates.
    fn detect(&self, rows: &[FeatureRow], ctx: &DetectorContext) -> DetectorOutcome;
}

/// All built-in detectors, in the order their results are collected.
pub fn default_detectors() -> Vec<Box<dyn PatternDetector>> {
    vec![
        Box::new(peak::PeakProductivityDetector::new()),
        Box::new(deep_work::DeepWorkDetector::new()),
        Box::new(context_switch::ContextSwitchDetector::new()),
        Box::new(rhythm::WorkRhythmDetector::new()),
        Box::new(affinity::ProjectAffinityDetector::new()),
        Box::new(energy::EnergyCorrelationDetector::new()),
    ]
}

// ============================================
// Shared helpers
// ============================================

/// Rows carrying a productivity rating, paired with the rating as f64.
pub(crate) fn rated(rows: &[FeatureRow]) -> Vec<(&FeatureRow, f64)> {
    rows.iter()
        .filter_map(|row| row.rating().map(|rating| (row, rating)))
        .collect()
}

/// Partition rated rows into ratings matching `inside` and the rest.
pub(crate) fn split_ratings<F>(rated: &[(&FeatureRow, f64)], inside: F) -> (Vec<f64>, Vec<f64>)
where
    F: Fn(&FeatureRow) -> bool,
{
    let mut matched = Vec::new();
    let mut rest = Vec::new();
    for (row, rating) in rated {
        if inside(row) {
            matched.push(*rating);
        } else {
            rest.push(*rating);
        }
    }
    (matched, rest)
}

/// Difference between the largest and smallest value (0 for empty input).
pub(crate) fn spread<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (min, max) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min.is_finite() && max.is_finite() {
        max - min
    } else {
        0.0
    }
}

/// Running mean for a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Bucket {
    pub sum: f64,
    pub count: usize,
}

impl Bucket {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Multiple-comparison correction over `tests` candidates.
pub(crate) fn bonferroni(p_value: f64, tests: usize) -> f64 {
    (p_value * tests.max(1) as f64).min(1.0)
}

/// Hour as "9am", "12pm", "11pm".
pub fn hour_label(hour: u8) -> String {
    let h = hour % 12;
    let h = if h == 0 { 12 } else { h };
    let period = if hour % 24 < 12 { "am" } else { "pm" };
    format!("{}{}", h, period)
}

/// Hour range covering `start..=end`, e.g. "9am–12pm" for 9..=11.
pub fn hour_range_label(start: u8, end: u8) -> String {
    format!("{}–{}", hour_label(start), hour_label((end + 1) % 24))
}

/// Get day name from index (0 = Sunday).
pub fn day_name(day: u8) -> &'static str {
    match day {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        _ => "Unknown",
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::FeatureRow;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    /// Builder for synthetic feature rows.
    pub fn row(idx: usize, hour: u8, minutes: f64, rating: Option<u8>) -> FeatureRow {
        let day = (idx / 8) as i64;
        let start = Utc.with_ymd_and_hms(2024, 1, 1, hour as u32, 0, 0).unwrap()
            + Duration::days(day);
        FeatureRow {
            session_id: format!("s{idx:04}"),
            start_time: start,
            local_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(day),
            hour_of_day: hour,
            day_of_week: ((day + 1) % 7) as u8,
            duration_minutes: minutes,
            productivity_rating: rating,
            energy_level: None,
            project_id: None,
            is_context_switch: false,
        }
    }
}
