//! SQLite-based local store for chat activity, HR records, and rollup metrics.
//!
//! The database lives at `~/.teampulse/teampulse.db`. Raw event tables
//! (messages, reactions, lifecycle events) hold what the sources sent; the
//! rollup tables (engagement_metrics, user_activity) are derived and fully
//! recomputable from the raw tables for any date window.

use std::path::PathBuf;

use rusqlite::Connection;

pub mod types;
pub use types::*;

pub struct MetricsDb {
    conn: Connection,
}

impl MetricsDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Self) -> Result<T, DbError>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(val) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at `~/.teampulse/teampulse.db` and apply
    /// the schema.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path. Useful for testing and for the
    /// `databasePath` config override.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        // WAL for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.teampulse/teampulse.db`.
    fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".teampulse").join("teampulse.db"))
    }
}

pub mod channels;
pub mod messages;
pub mod people;
pub mod rollups;
pub mod tasks;
pub mod timeoff;
pub mod webinars;

// =============================================================================
// Shared test utilities
// =============================================================================

#[cfg(test)]
pub mod test_utils {
    use super::MetricsDb;

    /// Create a temporary database for testing.
    ///
    /// We leak the `TempDir` so the directory persists for the duration of the
    /// test. Test temp dirs are cleaned up by the OS.
    pub fn test_db() -> MetricsDb {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("test.db");
        std::mem::forget(dir);
        MetricsDb::open_at(path).expect("Failed to open test database")
    }

    /// Message ts string for noon UTC on the given ISO date.
    pub fn noon_ts(date: &str, seq: u32) -> String {
        let day = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("valid date");
        let secs = day
            .and_hms_opt(12, 0, 0)
            .expect("valid time")
            .and_utc()
            .timestamp();
        format!("{}.{:06}", secs, seq)
    }
}

// =============================================================================
// Tests
// =============================================================================
