//! # workpulse-core
//!
//! Core library for workpulse - a productivity pattern analysis engine.
//!
//! This library provides:
//! - Domain types for sessions, patterns and reports
//! - Read-only session store adapters (in-memory, JSON, SQLite)
//! - Statistical pattern detection with confidence tiers
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows one way through three layers:
//! - **Input:** session records from a [`SessionStore`] (never mutated)
//! - **Features:** per-session rows in a canonical order (rebuilt per run)
//! - **Findings:** validated, ranked patterns and recommendations
//!
//! ## Example
//!
//! ```rust,no_run
//! use workpulse_core::analytics::{AnalysisRequest, PatternEngine};
//! use workpulse_core::{Config, SqliteSessionStore};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open the session database read-only
//! let store = SqliteSessionStore::open(&config.database_path()).expect("failed to open database");
//!
//! let engine = PatternEngine::new(config.analysis).expect("invalid analysis config");
//! let insights = engine
//!     .quick_insights(&store, &AnalysisRequest::new(chrono::Utc::now()))
//!     .expect("analysis failed");
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use store::{load_sessions_json, SessionStore, SqliteSessionStore};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod error;
pub mod logging;
pub mod store;
pub mod types;
