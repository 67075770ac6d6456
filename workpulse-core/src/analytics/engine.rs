//! Pattern analysis engine
//!
//! Drives one analysis run end to end:
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌─────────┐   ┌───────────┐   ┌───────────┐   ┌────────┐
//! │ SessionStore │──▶│ features │──▶│ quality │──▶│ detectors │──▶│ validator │──▶│ ranker │
//! └──────────────┘   └──────────┘   └─────────┘   └───────────┘   └───────────┘   └────────┘
//!                                                  (rayon fork-join)
//! ```
//!
//! Runs share nothing: every report is rebuilt from the store on each call,
//! and the only clock the engine reads is `AnalysisRequest::as_of`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use workpulse_core::analytics::{AnalysisRequest, PatternEngine};
//! use workpulse_core::config::AnalysisConfig;
//! use workpulse_core::store::load_sessions_json;
//!
//! let sessions = load_sessions_json("sessions.json".as_ref()).expect("readable input");
//! let engine = PatternEngine::new(AnalysisConfig::default()).expect("valid config");
//! let report = engine
//!     .analyze(&sessions, &AnalysisRequest::new(chrono::Utc::now()))
//!     .expect("enough history");
//! for pattern in &report.patterns {
//!     println!("{}: {}", pattern.confidence_tier, pattern.description);
//! }
//! ```

use super::detectors::{
    affinity, default_detectors, DetectorContext, DetectorOutcome, PatternDetector,
};
use super::features::{extract_features, FeatureRow};
use super::trends::{build_trends, TrendGranularity, TrendReport};
use super::{quality, ranker, validator};
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::store::SessionStore;
use crate::types::{
    AnalysisReport, AnalysisWindow, ConfidenceTier, PatternType, ScheduleSuggestion,
};
use chrono::{DateTime, Days, FixedOffset, NaiveDate, TimeZone, Utc};
use rayon::prelude::*;
use std::time::Instant;

/// Parameters of one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// First local date analyzed; defaults to `lookback_days` before `until`
    pub since: Option<NaiveDate>,
    /// Last local date analyzed (inclusive); defaults to the date of `as_of`
    pub until: Option<NaiveDate>,
    /// Drop patterns below this tier
    pub min_confidence: Option<ConfidenceTier>,
    /// Reference time; also stamped as the report's `generated_at`
    pub as_of: DateTime<Utc>,
}

impl AnalysisRequest {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            since: None,
            until: None,
            min_confidence: None,
            as_of,
        }
    }

    pub fn with_range(mut self, since: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    pub fn with_min_confidence(mut self, tier: Option<ConfidenceTier>) -> Self {
        self.min_confidence = tier;
        self
    }
}

/// Resolved window: local dates plus the UTC bounds `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedWindow {
    pub dates: AnalysisWindow,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn local_midnight(date: NaiveDate, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Registry and runner for pattern detectors.
pub struct PatternEngine {
    detectors: Vec<Box<dyn PatternDetector>>,
    config: AnalysisConfig,
}

impl PatternEngine {
    /// Create an engine with every built-in detector.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        let mut engine = Self::empty(config)?;
        for detector in default_detectors() {
            engine.register(detector);
        }
        Ok(engine)
    }

    /// Create an engine with no detectors registered.
    pub fn empty(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            detectors: Vec::new(),
            config,
        })
    }

    /// Register a detector. Results are collected in registration order.
    pub fn register(&mut self, detector: Box<dyn PatternDetector>) {
        tracing::debug!(detector = detector.name(), "Registered pattern detector");
        self.detectors.push(detector);
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Get list of registered detector names.
    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Resolve the request's dates into UTC bounds.
    pub fn resolve_window(&self, request: &AnalysisRequest) -> Result<ResolvedWindow> {
        let offset = self.config.offset()?;
        let until = request
            .until
            .unwrap_or_else(|| request.as_of.with_timezone(&offset).date_naive());
        let since = match request.since {
            Some(since) => since,
            None => until
                .checked_sub_days(Days::new(u64::from(self.config.lookback_days) - 1))
                .ok_or_else(|| {
                    Error::InvalidRequest(format!("lookback from {} is out of range", until))
                })?,
        };
        if since > until {
            return Err(Error::InvalidRequest(format!(
                "since ({}) is after until ({})",
                since, until
            )));
        }

        let bounds = until.succ_opt().and_then(|end_date| {
            Some((
                local_midnight(since, &offset)?,
                local_midnight(end_date, &offset)?,
            ))
        });
        let Some((start, end)) = bounds else {
            return Err(Error::InvalidRequest(format!(
                "date range {} to {} is out of range",
                since, until
            )));
        };

        Ok(ResolvedWindow {
            dates: AnalysisWindow { since, until },
            start,
            end,
        })
    }

    fn load_rows<S>(&self, store: &S, window: &ResolvedWindow) -> Result<Vec<FeatureRow>>
    where
        S: SessionStore + ?Sized,
    {
        let sessions = store.sessions_between(window.start, window.end)?;
        tracing::debug!(
            sessions = sessions.len(),
            since = %window.dates.since,
            until = %window.dates.until,
            "Fetched sessions"
        );
        extract_features(&sessions, &self.config)
    }

    fn run_detector(
        detector: &dyn PatternDetector,
        rows: &[FeatureRow],
        ctx: &DetectorContext,
    ) -> (PatternType, DetectorOutcome) {
        let start = Instant::now();
        let outcome = detector.detect(rows, ctx);
        let duration_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            DetectorOutcome::Found(candidates) => tracing::debug!(
                detector = detector.name(),
                candidates = candidates.len(),
                duration_ms,
                "Detector finished"
            ),
            DetectorOutcome::Abstained(reason) => tracing::debug!(
                detector = detector.name(),
                %reason,
                duration_ms,
                "Detector abstained"
            ),
        }
        (detector.pattern_type(), outcome)
    }

    /// Run every detector over `rows`, in parallel when configured.
    pub fn run_detectors(&self, rows: &[FeatureRow]) -> Vec<(PatternType, DetectorOutcome)> {
        let ctx = DetectorContext {
            config: &self.config,
        };
        if self.config.parallel {
            self.detectors
                .par_iter()
                .map(|d| Self::run_detector(d.as_ref(), rows, &ctx))
                .collect()
        } else {
            self.detectors
                .iter()
                .map(|d| Self::run_detector(d.as_ref(), rows, &ctx))
                .collect()
        }
    }

    /// Run a full analysis.
    ///
    /// Fails with [`Error::InsufficientData`] when the window holds less
    /// history than the quality thresholds require.
    pub fn analyze<S>(&self, store: &S, request: &AnalysisRequest) -> Result<AnalysisReport>
    where
        S: SessionStore + ?Sized,
    {
        let started = Instant::now();
        let window = self.resolve_window(request)?;
        let rows = self.load_rows(store, &window)?;
        let quality = quality::gate(&rows, &self.config.quality)?;

        let outcomes = self.run_detectors(&rows);
        let validation = validator::validate(outcomes, request.min_confidence);
        let patterns = ranker::rank(validation.accepted);
        let insights = ranker::top_insights(&patterns, self.config.max_insights);

        tracing::info!(
            sessions = quality.session_count,
            coverage_days = quality.coverage_days,
            patterns = patterns.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        Ok(AnalysisReport {
            generated_at: request.as_of,
            data_quality_score: quality.quality_score,
            coverage_days: quality.coverage_days,
            session_count: quality.session_count,
            completeness: quality.completeness,
            window: window.dates,
            patterns,
            insights,
            diagnostics: validation.diagnostics,
        })
    }

    /// Top recommendations only.
    pub fn quick_insights<S>(&self, store: &S, request: &AnalysisRequest) -> Result<Vec<String>>
    where
        S: SessionStore + ?Sized,
    {
        Ok(self.analyze(store, request)?.insights)
    }

    /// One suggestion per project whose best part of the day beats the rest
    /// at p < 0.1, strongest first.
    pub fn generate_schedule_suggestions<S>(
        &self,
        store: &S,
        request: &AnalysisRequest,
    ) -> Result<Vec<ScheduleSuggestion>>
    where
        S: SessionStore + ?Sized,
    {
        let window = self.resolve_window(request)?;
        let rows = self.load_rows(store, &window)?;
        quality::gate(&rows, &self.config.quality)?;

        let scan = affinity::scan_projects(&rows);
        let mut suggestions: Vec<ScheduleSuggestion> = scan
            .pairings
            .into_iter()
            .filter(|pairing| pairing.test.mean_difference() > 0.0)
            .filter_map(|pairing| {
                let tier = ConfidenceTier::from_p_value(pairing.test.p_value)?;
                if request.min_confidence.map_or(false, |floor| tier < floor) {
                    return None;
                }
                Some(ScheduleSuggestion {
                    rationale: format!(
                        "{} averages {:.2} in the {} vs {:.2} for other sessions",
                        pairing.project_id,
                        pairing.test.mean_a,
                        pairing.daypart.label(),
                        pairing.test.mean_b
                    ),
                    project_id: pairing.project_id,
                    suggested_hour: pairing.best_hour,
                    confidence_tier: tier,
                })
            })
            .collect();

        suggestions.sort_by(|a, b| {
            b.confidence_tier
                .cmp(&a.confidence_tier)
                .then_with(|| a.project_id.cmp(&b.project_id))
        });
        tracing::info!(suggestions = suggestions.len(), "Schedule suggestions generated");
        Ok(suggestions)
    }

    /// Activity trend series over the request window.
    ///
    /// Trends describe activity rather than infer patterns, so only an empty
    /// window is an error here.
    pub fn trends<S>(
        &self,
        store: &S,
        request: &AnalysisRequest,
        granularity: TrendGranularity,
    ) -> Result<TrendReport>
    where
        S: SessionStore + ?Sized,
    {
        let window = self.resolve_window(request)?;
        let rows = self.load_rows(store, &window)?;
        Ok(build_trends(&rows, granularity, window.dates))
    }
}
