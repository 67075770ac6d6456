//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/workpulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/workpulse/` (~/.config/workpulse/)
//! - Data: `$XDG_DATA_HOME/workpulse/` (~/.local/share/workpulse/)
//! - State/Logs: `$XDG_STATE_HOME/workpulse/` (~/.local/state/workpulse/)
//!
//! Every analysis threshold lives in [`AnalysisConfig`] and is handed to the
//! engine explicitly. Loosening a threshold is only possible by supplying a
//! different value here; the defaults are fixed.

use crate::error::{Error, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Analysis thresholds and tuning
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Session store location
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Minimum-sample policy enforced by the data quality gate.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct QualityThresholds {
    /// Distinct calendar days that must contain at least one session
    #[serde(default = "default_min_coverage_days")]
    pub min_coverage_days: usize,

    /// Total sessions required
    #[serde(default = "default_min_sessions")]
    pub min_sessions: usize,

    /// Coverage that earns the full coverage share of the quality score
    #[serde(default = "default_coverage_target_days")]
    pub coverage_target_days: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_coverage_days: default_min_coverage_days(),
            min_sessions: default_min_sessions(),
            coverage_target_days: default_coverage_target_days(),
        }
    }
}

fn default_min_coverage_days() -> usize {
    7
}

fn default_min_sessions() -> usize {
    10
}

fn default_coverage_target_days() -> usize {
    30
}

/// Analysis configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Minimum-sample policy
    #[serde(default)]
    pub quality: QualityThresholds,

    /// Days of history analyzed when the caller gives no start date
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Offset (minutes east of UTC) used to derive hour, weekday and date
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Minimum prominence (rating points) for an hourly peak
    #[serde(default = "default_peak_min_prominence")]
    pub peak_min_prominence: f64,

    /// Maximum number of hourly peaks reported
    #[serde(default = "default_max_peaks")]
    pub max_peaks: usize,

    /// Sessions a time bucket needs before it can be called a peak
    #[serde(default = "default_min_bucket_sessions")]
    pub min_bucket_sessions: usize,

    /// Shortest session that counts as deep work
    #[serde(default = "default_deep_work_min_minutes")]
    pub deep_work_min_minutes: u32,

    /// Upper end of the deep work duration search
    #[serde(default = "default_deep_work_max_minutes")]
    pub deep_work_max_minutes: u32,

    /// Step between candidate deep work durations
    #[serde(default = "default_deep_work_step_minutes")]
    pub deep_work_step_minutes: u32,

    /// Smallest cluster count tried by the rhythm detector
    #[serde(default = "default_rhythm_min_clusters")]
    pub rhythm_min_clusters: usize,

    /// Largest cluster count tried by the rhythm detector
    #[serde(default = "default_rhythm_max_clusters")]
    pub rhythm_max_clusters: usize,

    /// k-means iteration cap; not converging means abstaining
    #[serde(default = "default_rhythm_max_iterations")]
    pub rhythm_max_iterations: usize,

    /// Number of recommendations in the insights summary
    #[serde(default = "default_max_insights")]
    pub max_insights: usize,

    /// Run detectors on the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            quality: QualityThresholds::default(),
            lookback_days: default_lookback_days(),
            utc_offset_minutes: 0,
            peak_min_prominence: default_peak_min_prominence(),
            max_peaks: default_max_peaks(),
            min_bucket_sessions: default_min_bucket_sessions(),
            deep_work_min_minutes: default_deep_work_min_minutes(),
            deep_work_max_minutes: default_deep_work_max_minutes(),
            deep_work_step_minutes: default_deep_work_step_minutes(),
            rhythm_min_clusters: default_rhythm_min_clusters(),
            rhythm_max_clusters: default_rhythm_max_clusters(),
            rhythm_max_iterations: default_rhythm_max_iterations(),
            max_insights: default_max_insights(),
            parallel: default_parallel(),
        }
    }
}

fn default_lookback_days() -> u32 {
    90
}

fn default_peak_min_prominence() -> f64 {
    0.5
}

fn default_max_peaks() -> usize {
    2
}

fn default_min_bucket_sessions() -> usize {
    3
}

fn default_deep_work_min_minutes() -> u32 {
    60
}

fn default_deep_work_max_minutes() -> u32 {
    240
}

fn default_deep_work_step_minutes() -> u32 {
    30
}

fn default_rhythm_min_clusters() -> usize {
    2
}

fn default_rhythm_max_clusters() -> usize {
    5
}

fn default_rhythm_max_iterations() -> usize {
    100
}

/// Upper bound for `max_insights`; the summary is meant to stay short.
pub const MAX_INSIGHTS: usize = 5;

fn default_max_insights() -> usize {
    MAX_INSIGHTS
}

fn default_parallel() -> bool {
    true
}

impl AnalysisConfig {
    /// The fixed offset hour-of-day and calendar dates are computed in.
    pub fn offset(&self) -> Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                Error::Config(format!(
                    "analysis.utc_offset_minutes out of range: {}",
                    self.utc_offset_minutes
                ))
            })
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        self.offset()?;

        if self.quality.min_coverage_days == 0 || self.quality.min_sessions == 0 {
            return Err(Error::Config(
                "analysis.quality minimums must be at least 1".to_string(),
            ));
        }
        if self.quality.coverage_target_days == 0 {
            return Err(Error::Config(
                "analysis.quality.coverage_target_days must be at least 1".to_string(),
            ));
        }
        if self.lookback_days == 0 {
            return Err(Error::Config(
                "analysis.lookback_days must be at least 1".to_string(),
            ));
        }
        if !self.peak_min_prominence.is_finite() || self.peak_min_prominence < 0.0 {
            return Err(Error::Config(
                "analysis.peak_min_prominence must be a non-negative number".to_string(),
            ));
        }
        if self.max_peaks == 0 || self.min_bucket_sessions == 0 {
            return Err(Error::Config(
                "analysis.max_peaks and analysis.min_bucket_sessions must be at least 1"
                    .to_string(),
            ));
        }
        if self.deep_work_step_minutes == 0
            || self.deep_work_min_minutes == 0
            || self.deep_work_min_minutes >= self.deep_work_max_minutes
        {
            return Err(Error::Config(
                "analysis.deep_work range must be positive with min < max and a non-zero step"
                    .to_string(),
            ));
        }
        if self.rhythm_min_clusters < 2 || self.rhythm_min_clusters > self.rhythm_max_clusters {
            return Err(Error::Config(
                "analysis.rhythm cluster range must satisfy 2 <= min <= max".to_string(),
            ));
        }
        if self.rhythm_max_iterations == 0 {
            return Err(Error::Config(
                "analysis.rhythm_max_iterations must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_INSIGHTS).contains(&self.max_insights) {
            return Err(Error::Config(format!(
                "analysis.max_insights must be between 1 and {}",
                MAX_INSIGHTS
            )));
        }
        Ok(())
    }
}

/// Where the session store lives
#[derive(Debug, Deserialize, Default, Clone)]
pub struct StoreConfig {
    /// Override path for the sessions database
    pub database_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.analysis.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/workpulse/config.toml` (~/.config/workpulse/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("workpulse").join("config.toml")
    }

    /// Returns the data directory path (for the sessions database)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("workpulse")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("workpulse")
    }

    /// Returns the sessions database path, honoring `[store] database_path`.
    pub fn database_path(&self) -> PathBuf {
        self.store
            .database_path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("sessions.db"))
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
