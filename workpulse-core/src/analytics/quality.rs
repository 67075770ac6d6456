//! Data quality gate
//!
//! Decides whether the extracted history is trustworthy enough to analyze.

use super::features::FeatureRow;
use crate::config::QualityThresholds;
use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// Weight of date coverage in the quality score.
const COVERAGE_WEIGHT: f64 = 60.0;
/// Weight of rating completeness in the quality score.
const COMPLETENESS_WEIGHT: f64 = 40.0;

/// Coverage and completeness of a feature set.
#[derive(Debug, Clone, PartialEq)]
pub struct DataQuality {
    /// Distinct local dates with at least one session
    pub coverage_days: usize,
    pub session_count: usize,
    pub rated_sessions: usize,
    /// rated / total, 0.0-1.0
    pub completeness: f64,
    /// 0-100
    pub quality_score: f64,
}

/// Measure coverage, completeness and the composite score.
pub fn assess(rows: &[FeatureRow], thresholds: &QualityThresholds) -> DataQuality {
    let coverage_days = rows
        .iter()
        .map(|r| r.local_date)
        .collect::<BTreeSet<_>>()
        .len();
    let session_count = rows.len();
    let rated_sessions = rows
        .iter()
        .filter(|r| r.productivity_rating.is_some())
        .count();

    let completeness = if session_count == 0 {
        0.0
    } else {
        rated_sessions as f64 / session_count as f64
    };

    let coverage_ratio =
        (coverage_days as f64 / thresholds.coverage_target_days.max(1) as f64).min(1.0);
    let quality_score =
        (COVERAGE_WEIGHT * coverage_ratio + COMPLETENESS_WEIGHT * completeness).clamp(0.0, 100.0);

    DataQuality {
        coverage_days,
        session_count,
        rated_sessions,
        completeness,
        quality_score,
    }
}

/// Enforce the minimum-sample policy.
pub fn enforce(quality: &DataQuality, thresholds: &QualityThresholds) -> Result<()> {
    if quality.coverage_days < thresholds.min_coverage_days
        || quality.session_count < thresholds.min_sessions
    {
        tracing::info!(
            coverage_days = quality.coverage_days,
            sessions = quality.session_count,
            required_days = thresholds.min_coverage_days,
            required_sessions = thresholds.min_sessions,
            "Not enough history for analysis"
        );
        return Err(Error::InsufficientData {
            coverage_days: quality.coverage_days,
            required_days: thresholds.min_coverage_days,
            session_count: quality.session_count,
            required_sessions: thresholds.min_sessions,
        });
    }
    Ok(())
}

/// Assess and enforce in one step.
pub fn gate(rows: &[FeatureRow], thresholds: &QualityThresholds) -> Result<DataQuality> {
    let quality = assess(rows, thresholds);
    enforce(&quality, thresholds)?;
    Ok(quality)
}
