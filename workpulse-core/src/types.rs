//! Core domain types for workpulse
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Session** | One logged block of work, owned by the external session store |
//! | **Context switch** | A session on a different project than the one before it |
//! | **Pattern** | A statistically validated regularity in past sessions |
//! | **Confidence tier** | Bucketed p-value used to communicate reliability |
//! | **Effect size** | Magnitude of a pattern, independent of sample size |
//! | **Insight** | One of the top-ranked recommendations of a report |
//!
//! Session records are input only. Everything else here is rebuilt from
//! scratch on every analysis run and never persisted by the engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================
// Session input
// ============================================

/// A logged work session as provided by the session store.
///
/// Ratings are optional: unrated sessions still feed timing statistics
/// but are skipped by every rating-dependent detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique identifier
    pub id: String,
    /// Project this session belongs to, if any
    #[serde(default)]
    pub project_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Self-reported productivity, 1-5
    #[serde(default)]
    pub productivity_rating: Option<u8>,
    /// Self-reported energy, 1-5
    #[serde(default)]
    pub energy_level: Option<u8>,
    /// True when the previous session (by start time) was on another project
    #[serde(default)]
    pub is_context_switch: bool,
}

impl SessionRecord {
    /// Length of the session in minutes (fractional).
    pub fn duration_minutes(&self) -> f64 {
        (self.end_time - self.start_time).num_seconds() as f64 / 60.0
    }

    /// Check the record's invariants, returning a reason if it is unusable.
    pub fn validation_error(&self) -> Option<String> {
        if self.end_time <= self.start_time {
            return Some("end_time must be after start_time".to_string());
        }
        if let Some(rating) = self.productivity_rating {
            if !(1..=5).contains(&rating) {
                return Some(format!("productivity_rating {} outside 1-5", rating));
            }
        }
        if let Some(energy) = self.energy_level {
            if !(1..=5).contains(&energy) {
                return Some(format!("energy_level {} outside 1-5", energy));
            }
        }
        None
    }
}

// ============================================
// Patterns
// ============================================

/// The six kinds of pattern the engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    PeakProductivity,
    DeepWorkWindow,
    ContextSwitchCost,
    WorkRhythm,
    ProjectAffinity,
    EnergyCorrelation,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::PeakProductivity => "peak_productivity",
            PatternType::DeepWorkWindow => "deep_work_window",
            PatternType::ContextSwitchCost => "context_switch_cost",
            PatternType::WorkRhythm => "work_rhythm",
            PatternType::ProjectAffinity => "project_affinity",
            PatternType::EnergyCorrelation => "energy_correlation",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete reliability bucket derived from a p-value.
///
/// Ordered from weakest to strongest, so `VeryHigh > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    /// p < 0.1
    Low,
    /// p < 0.05
    Medium,
    /// p < 0.01
    High,
    /// p < 0.001
    VeryHigh,
}

impl ConfidenceTier {
    /// Map a p-value to its tier; `None` when p >= 0.1 (not reportable).
    pub fn from_p_value(p_value: f64) -> Option<Self> {
        if !p_value.is_finite() || p_value < 0.0 {
            return None;
        }
        if p_value < 0.001 {
            Some(ConfidenceTier::VeryHigh)
        } else if p_value < 0.01 {
            Some(ConfidenceTier::High)
        } else if p_value < 0.05 {
            Some(ConfidenceTier::Medium)
        } else if p_value < 0.1 {
            Some(ConfidenceTier::Low)
        } else {
            None
        }
    }

    /// Exclusive p-value ceiling for this tier.
    pub fn p_threshold(&self) -> f64 {
        match self {
            ConfidenceTier::VeryHigh => 0.001,
            ConfidenceTier::High => 0.01,
            ConfidenceTier::Medium => 0.05,
            ConfidenceTier::Low => 0.1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::VeryHigh => "very_high",
            ConfidenceTier::High => "high",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::Low => "low",
        }
    }

    /// Display label for narrative output (e.g., "very high").
    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceTier::VeryHigh => "very high",
            ConfidenceTier::High => "high",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::Low => "low",
        }
    }
}

impl std::str::FromStr for ConfidenceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "very_high" => Ok(ConfidenceTier::VeryHigh),
            "high" => Ok(ConfidenceTier::High),
            "medium" => Ok(ConfidenceTier::Medium),
            "low" => Ok(ConfidenceTier::Low),
            _ => Err(format!("unknown confidence tier: {}", s)),
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse time-of-day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Daypart {
    /// 05:00-11:59
    Morning,
    /// 12:00-16:59
    Afternoon,
    /// 17:00-21:59
    Evening,
    /// 22:00-04:59
    Night,
}

impl Daypart {
    pub const ALL: [Daypart; 4] = [
        Daypart::Morning,
        Daypart::Afternoon,
        Daypart::Evening,
        Daypart::Night,
    ];

    pub fn from_hour(hour: u8) -> Self {
        match hour {
            5..=11 => Daypart::Morning,
            12..=16 => Daypart::Afternoon,
            17..=21 => Daypart::Evening,
            _ => Daypart::Night,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Daypart::Morning => "morning",
            Daypart::Afternoon => "afternoon",
            Daypart::Evening => "evening",
            Daypart::Night => "late night",
        }
    }
}

/// Centroid summary of one discovered work rhythm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmProfile {
    /// Generated name, e.g. "long morning sessions"
    pub name: String,
    pub sessions: usize,
    pub mean_hour: f64,
    pub mean_duration_minutes: f64,
    pub mean_rating: f64,
    pub mean_energy: f64,
}

/// Machine-readable findings behind a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternEvidence {
    /// Hourly peak; the window is the plateau of equal hourly means
    PeakHour {
        peak_hour: u8,
        window_start: u8,
        window_end: u8,
        prominence: f64,
        peak_mean: f64,
        baseline_mean: f64,
    },
    /// Best day of the week (0 = Sunday)
    PeakDay {
        day_of_week: u8,
        day_mean: f64,
        baseline_mean: f64,
    },
    DeepWork {
        optimal_duration_minutes: u32,
        best_start_hour: u8,
        long_mean: f64,
        short_mean: f64,
        qualifying_sessions: usize,
    },
    ContextSwitch {
        switched_mean: f64,
        consecutive_mean: f64,
        switched_sessions: usize,
        consecutive_sessions: usize,
    },
    Rhythm {
        clusters: usize,
        silhouette: f64,
        profiles: Vec<RhythmProfile>,
    },
    ProjectAffinity {
        project_id: String,
        daypart: Daypart,
        best_hour: u8,
        pair_mean: f64,
        baseline_mean: f64,
    },
    EnergyCorrelation {
        correlation: f64,
        best_energy_level: u8,
        best_level_mean: f64,
    },
}

/// A validated pattern, ready for ranking and display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternResult {
    pub pattern_type: PatternType,
    pub description: String,
    pub p_value: f64,
    pub confidence_tier: ConfidenceTier,
    /// Cohen's d, a correlation coefficient, eta squared, or a signed
    /// rating-point difference, depending on the detector
    pub effect_size: f64,
    pub supporting_sample_size: usize,
    pub recommendation: String,
    pub evidence: PatternEvidence,
}

// ============================================
// Reports
// ============================================

/// Inclusive local-date range an analysis covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub since: NaiveDate,
    pub until: NaiveDate,
}

/// What happened to one detector or candidate during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiagnosticOutcome {
    /// A candidate passed validation
    Accepted {
        p_value: f64,
        confidence_tier: ConfidenceTier,
    },
    /// A candidate was found but failed significance or sample checks
    Rejected { reason: String },
    /// The detector legitimately found nothing to test
    Abstained { reason: String },
}

/// Diagnostic line for debug output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub pattern_type: PatternType,
    #[serde(flatten)]
    pub outcome: DiagnosticOutcome,
}

/// Complete result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    /// Composite of coverage and completeness, 0-100
    pub data_quality_score: f64,
    pub coverage_days: usize,
    pub session_count: usize,
    /// Fraction of sessions carrying a productivity rating
    pub completeness: f64,
    pub window: AnalysisWindow,
    /// Validated patterns, highest ranked first
    pub patterns: Vec<PatternResult>,
    /// Top recommendations (at most five by default)
    pub insights: Vec<String>,
    pub diagnostics: Vec<DiagnosticEntry>,
}

impl AnalysisReport {
    /// Patterns of one type, in rank order.
    pub fn patterns_of(&self, pattern_type: PatternType) -> impl Iterator<Item = &PatternResult> {
        self.patterns
            .iter()
            .filter(move |p| p.pattern_type == pattern_type)
    }
}

/// A project/time pairing worth putting on the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSuggestion {
    pub project_id: String,
    /// Local hour of day, 0-23
    pub suggested_hour: u8,
    pub rationale: String,
    pub confidence_tier: ConfidenceTier,
}
