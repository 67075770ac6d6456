//! Analytics module for workpulse
//!
//! Everything between raw session records and a finished report:
//! - Feature extraction and the data quality gate
//! - Pattern detectors and their shared statistics
//! - Validation, ranking and report encodings
//! - Activity trends
//!
//! See [`engine`] for how a run is put together and [`detectors`] for the
//! built-in detectors.

pub mod detectors;
pub mod engine;
pub mod features;
pub mod quality;
pub mod ranker;
pub mod report;
pub mod stats;
pub mod trends;
pub mod validator;

// Engine exports
pub use engine::{AnalysisRequest, PatternEngine, ResolvedWindow};

pub use detectors::{
    default_detectors, Candidate, DetectorContext, DetectorOutcome, PatternDetector,
};
pub use features::{extract_features, FeatureRow};
pub use quality::DataQuality;
pub use report::{render, render_insights, render_schedule, render_trends, ReportFormat};
pub use trends::{TrendChange, TrendGranularity, TrendPoint, TrendReport};
pub use validator::Validation;
