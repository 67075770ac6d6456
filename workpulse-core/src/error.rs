//! Error types for workpulse-core

use thiserror::Error;

/// Main error type for the workpulse-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Not enough history to run an analysis.
    ///
    /// Always recoverable: the caller should prompt the user to keep logging
    /// sessions. Carries actual and required counts so the message can say
    /// exactly how much more data is needed.
    #[error(
        "insufficient data: {coverage_days} of {required_days} days covered, \
         {session_count} of {required_sessions} sessions logged"
    )]
    InsufficientData {
        coverage_days: usize,
        required_days: usize,
        session_count: usize,
        required_sessions: usize,
    },

    /// Requested output encoding is not supported
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// Database error from the session store adapter
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed analysis request (e.g. inverted date range)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A session record the store could not decode
    #[error("invalid session {id}: {message}")]
    InvalidSession { id: String, message: String },
}

impl Error {
    /// Whether this is the actionable "keep logging" error.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Error::InsufficientData { .. })
    }

    /// Human-facing advice for an [`Error::InsufficientData`], e.g.
    /// "Log sessions on 2 more days and 1 more session to unlock analysis."
    pub fn guidance(&self) -> Option<String> {
        let Error::InsufficientData {
            coverage_days,
            required_days,
            session_count,
            required_sessions,
        } = self
        else {
            return None;
        };

        let days_needed = required_days.saturating_sub(*coverage_days);
        let sessions_needed = required_sessions.saturating_sub(*session_count);

        let mut parts = Vec::new();
        if days_needed > 0 {
            parts.push(format!(
                "sessions on {} more day{}",
                days_needed,
                if days_needed == 1 { "" } else { "s" }
            ));
        }
        if sessions_needed > 0 {
            parts.push(format!(
                "{} more session{}",
                sessions_needed,
                if sessions_needed == 1 { "" } else { "s" }
            ));
        }

        Some(format!(
            "Log {} to unlock pattern analysis.",
            parts.join(" and ")
        ))
    }
}

/// Result type alias for workpulse-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guidance_counts_missing_days_and_sessions() {
        let err = Error::InsufficientData {
            coverage_days: 5,
            required_days: 7,
            session_count: 9,
            required_sessions: 10,
        };
        assert!(err.is_insufficient_data());
        assert_eq!(
            err.guidance().unwrap(),
            "Log sessions on 2 more days and 1 more session to unlock pattern analysis."
        );
    }

    #[test]
    fn test_guidance_only_for_insufficient_data() {
        let err = Error::UnsupportedFormat("yaml".to_string());
        assert!(!err.is_insufficient_data());
        assert!(err.guidance().is_none());
    }
}
