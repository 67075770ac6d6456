//! Session store adapters
//!
//! The engine only reads sessions through [`SessionStore`]. Adapters:
//! - in-memory slices and vectors
//! - JSON files ([`load_sessions_json`])
//! - a read-only SQLite database ([`SqliteSessionStore`])

use crate::error::{Error, Result};
use crate::types::SessionRecord;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, Row};
use serde::Deserialize;
use std::path::Path;

/// Read-only access to recorded sessions.
pub trait SessionStore {
    /// Sessions whose start time falls in `[start, end)`.
    fn sessions_between(&self, start: DateTime<Utc>, end: DateTime<Utc>)
        -> Result<Vec<SessionRecord>>;
}

impl SessionStore for [SessionRecord] {
    fn sessions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>> {
        Ok(self
            .iter()
            .filter(|s| s.start_time >= start && s.start_time < end)
            .cloned()
            .collect())
    }
}

impl SessionStore for Vec<SessionRecord> {
    fn sessions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>> {
        self.as_slice().sessions_between(start, end)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SessionFile {
    List(Vec<SessionRecord>),
    Wrapped { sessions: Vec<SessionRecord> },
}

/// Load sessions from a JSON file: either an array of sessions or an
/// object with a `sessions` array.
pub fn load_sessions_json(path: &Path) -> Result<Vec<SessionRecord>> {
    let content = std::fs::read_to_string(path)?;
    let sessions = match serde_json::from_str::<SessionFile>(&content)? {
        SessionFile::List(sessions) => sessions,
        SessionFile::Wrapped { sessions } => sessions,
    };
    tracing::debug!(path = %path.display(), sessions = sessions.len(), "Loaded session file");
    Ok(sessions)
}

/// Read-only view over a `sessions` table.
///
/// Expected columns: `id TEXT`, `project_id TEXT NULL`, `start_time TEXT`,
/// `end_time TEXT` (RFC 3339), `productivity_rating INTEGER NULL`,
/// `energy_level INTEGER NULL`, `is_context_switch INTEGER` (0/1).
pub struct SqliteSessionStore {
    conn: Connection,
}

struct RawSession {
    id: String,
    project_id: Option<String>,
    start_time: String,
    end_time: String,
    productivity_rating: Option<i64>,
    energy_level: Option<i64>,
    is_context_switch: bool,
}

impl RawSession {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            project_id: row.get("project_id")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            productivity_rating: row.get("productivity_rating")?,
            energy_level: row.get("energy_level")?,
            is_context_switch: row.get::<_, Option<bool>>("is_context_switch")?.unwrap_or(false),
        })
    }

    fn into_record(self) -> Result<SessionRecord> {
        let invalid = |message: String| Error::InvalidSession {
            id: self.id.clone(),
            message,
        };
        let timestamp = |value: &str| {
            DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| invalid(format!("bad timestamp '{}': {}", value, e)))
        };
        let level = |value: Option<i64>, field: &str| {
            value
                .map(|v| u8::try_from(v).map_err(|_| invalid(format!("{} out of range: {}", field, v))))
                .transpose()
        };

        Ok(SessionRecord {
            start_time: timestamp(&self.start_time)?,
            end_time: timestamp(&self.end_time)?,
            productivity_rating: level(self.productivity_rating, "productivity_rating")?,
            energy_level: level(self.energy_level, "energy_level")?,
            project_id: self.project_id.clone(),
            is_context_switch: self.is_context_switch,
            id: self.id.clone(),
        })
    }
}

impl SqliteSessionStore {
    /// Open an existing database read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        tracing::debug!(path = %path.display(), "Opened session database");
        Ok(Self { conn })
    }

    /// Wrap an existing connection (for testing).
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl SessionStore for SqliteSessionStore {
    fn sessions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, project_id, start_time, end_time,
                   productivity_rating, energy_level, is_context_switch
            FROM sessions
            ORDER BY start_time, id
            "#,
        )?;
        let raw = stmt
            .query_map([], RawSession::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // Timestamps may carry any offset, so the window is applied after parsing
        let mut sessions = Vec::new();
        for row in raw {
            match row.into_record() {
                Ok(session) if session.start_time >= start && session.start_time < end => {
                    sessions.push(session)
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable session row"),
            }
        }
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(id: &str, day: u32) -> SessionRecord {
        let start = Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap();
        SessionRecord {
            id: id.to_string(),
            project_id: None,
            start_time: start,
            end_time: start + chrono::Duration::minutes(30),
            productivity_rating: Some(3),
            energy_level: None,
            is_context_switch: false,
        }
    }

    #[test]
    fn test_slice_window_is_half_open() {
        let sessions = vec![session("a", 1), session("b", 2), session("c", 3)];
        let start = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 3, 9, 0, 0).unwrap();
        let found = sessions.sessions_between(start, end).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "b");
    }

    #[test]
    fn test_sqlite_store_reads_and_skips_bad_rows() {
        let conn = Connection::open_in_memory().unwrap();
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
            INSERT INTO sessions VALUES
                ('a', 'alpha', '2024-03-01T09:00:00Z', '2024-03-01T10:00:00Z', 4, 3, 0),
                ('b', NULL, '2024-03-02T09:00:00+02:00', '2024-03-02T09:30:00+02:00', NULL, NULL, 1),
                ('bad', NULL, 'yesterday', '2024-03-02T10:00:00Z', 3, 3, 0),
                ('late', NULL, '2024-04-01T09:00:00Z', '2024-04-01T10:00:00Z', 3, 3, 0);
            "#,
        )
        .unwrap();

        let store = SqliteSessionStore::from_connection(conn);
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let sessions = store.sessions_between(start, end).unwrap();

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, "a");
        assert_eq!(sessions[0].project_id.as_deref(), Some("alpha"));
        assert_eq!(sessions[0].productivity_rating, Some(4));
        assert_eq!(sessions[1].id, "b");
        assert!(sessions[1].is_context_switch);
        assert_eq!(
            sessions[1].start_time,
            Utc.with_ymd_and_hms(2024, 3, 2, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_json_loader_accepts_both_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.json");
        let wrapped = dir.path().join("wrapped.json");
        let records = vec![session("a", 1)];

        std::fs::write(&list, serde_json::to_string(&records).unwrap()).unwrap();
        std::fs::write(
            &wrapped,
            serde_json::json!({ "sessions": records }).to_string(),
        )
        .unwrap();

        assert_eq!(load_sessions_json(&list).unwrap(), records);
        assert_eq!(load_sessions_json(&wrapped).unwrap(), records);
    }
}
