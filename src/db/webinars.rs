//! Webinar, host, and attendee storage.
//!
//! Attendee rows are insert-only. Webinar aggregate columns (totals, average
//! duration) are overwritten after every upload from the attendee rows, so
//! they stay derivable.

use rusqlite::{params, Row};

use super::types::{DbError, DbWebinar, DbWebinarAttendee};
use super::MetricsDb;

/// Per-host rollup across all webinars.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRollup {
    pub host_id: i64,
    pub host_name: String,
    pub webinar_count: i64,
    pub total_attendees: i64,
}

fn map_webinar_row(row: &Row) -> rusqlite::Result<DbWebinar> {
    Ok(DbWebinar {
        id: row.get(0)?,
        name: row.get(1)?,
        host_id: row.get(2)?,
        meeting_code: row.get(3)?,
        total_attendees: row.get(4)?,
        unique_attendees: row.get(5)?,
        average_duration: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl MetricsDb {
    /// Look up a host by name, creating the row on first sight.
    pub fn get_or_create_host(&self, name: &str) -> Result<i64, DbError> {
        self.conn_ref().execute(
            "INSERT OR IGNORE INTO webinar_hosts (name) VALUES (?1)",
            params![name],
        )?;
        let id = self.conn_ref().query_row(
            "SELECT id FROM webinar_hosts WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn insert_webinar(
        &self,
        name: &str,
        host_id: Option<i64>,
        meeting_code: Option<&str>,
    ) -> Result<i64, DbError> {
        self.conn_ref().execute(
            "INSERT INTO webinars (name, host_id, meeting_code) VALUES (?1, ?2, ?3)",
            params![name, host_id, meeting_code],
        )?;
        Ok(self.conn_ref().last_insert_rowid())
    }

    /// Insert an attendee row if its natural key is new.
    pub fn insert_webinar_attendee(&self, attendee: &DbWebinarAttendee) -> Result<bool, DbError> {
        let written = self.conn_ref().execute(
            "INSERT OR IGNORE INTO webinar_attendees
                (webinar_id, participant_name, attendance_started_at, joined_at,
                 attendance_stopped_at, attended_duration, meeting_code)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                attendee.webinar_id,
                attendee.participant_name,
                attendee.attendance_started_at,
                attendee.joined_at,
                attendee.attendance_stopped_at,
                attendee.attended_duration,
                attendee.meeting_code,
            ],
        )?;
        Ok(written > 0)
    }

    pub fn update_webinar_aggregates(
        &self,
        webinar_id: i64,
        total_attendees: i64,
        unique_attendees: i64,
        average_duration: Option<&str>,
    ) -> Result<(), DbError> {
        self.conn_ref().execute(
            "UPDATE webinars
             SET total_attendees = ?2,
                 unique_attendees = ?3,
                 average_duration = ?4,
                 updated_at = datetime('now')
             WHERE id = ?1",
            params![webinar_id, total_attendees, unique_attendees, average_duration],
        )?;
        Ok(())
    }

    /// Remove a webinar and its attendee rows.
    pub fn delete_webinar(&self, webinar_id: i64) -> Result<(), DbError> {
        self.conn_ref().execute(
            "DELETE FROM webinar_attendees WHERE webinar_id = ?1",
            params![webinar_id],
        )?;
        self.conn_ref()
            .execute("DELETE FROM webinars WHERE id = ?1", params![webinar_id])?;
        Ok(())
    }

    pub fn get_webinar(&self, id: i64) -> Result<Option<DbWebinar>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, name, host_id, meeting_code, total_attendees,
                    unique_attendees, average_duration, created_at
             FROM webinars WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], map_webinar_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// All webinars, newest first.
    pub fn list_webinars(&self) -> Result<Vec<DbWebinar>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, name, host_id, meeting_code, total_attendees,
                    unique_attendees, average_duration, created_at
             FROM webinars ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], map_webinar_row)?;
        let mut webinars = Vec::new();
        for row in rows {
            webinars.push(row?);
        }
        Ok(webinars)
    }

    /// Webinars sorted by attendance, busiest first.
    pub fn top_webinars(&self, limit: usize) -> Result<Vec<DbWebinar>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, name, host_id, meeting_code, total_attendees,
                    unique_attendees, average_duration, created_at
             FROM webinars ORDER BY total_attendees DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], map_webinar_row)?;
        let mut webinars = Vec::new();
        for row in rows {
            webinars.push(row?);
        }
        Ok(webinars)
    }

    pub fn webinar_attendees(&self, webinar_id: i64) -> Result<Vec<DbWebinarAttendee>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT webinar_id, participant_name, attendance_started_at, joined_at,
                    attendance_stopped_at, attended_duration, meeting_code
             FROM webinar_attendees WHERE webinar_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![webinar_id], |row| {
            Ok(DbWebinarAttendee {
                webinar_id: row.get(0)?,
                participant_name: row.get(1)?,
                attendance_started_at: row.get(2)?,
                joined_at: row.get(3)?,
                attendance_stopped_at: row.get(4)?,
                attended_duration: row.get(5)?,
                meeting_code: row.get(6)?,
            })
        })?;
        let mut attendees = Vec::new();
        for row in rows {
            attendees.push(row?);
        }
        Ok(attendees)
    }

    /// (total rows, distinct participant names) for a webinar.
    pub fn webinar_attendance_counts(&self, webinar_id: i64) -> Result<(i64, i64), DbError> {
        let counts = self.conn_ref().query_row(
            "SELECT COUNT(*), COUNT(DISTINCT participant_name)
             FROM webinar_attendees WHERE webinar_id = ?1",
            params![webinar_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    pub fn host_name(&self, host_id: i64) -> Result<Option<String>, DbError> {
        let mut stmt = self
            .conn_ref()
            .prepare("SELECT name FROM webinar_hosts WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![host_id], |row| row.get(0))?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Per-host webinar and attendance totals, busiest host first.
    pub fn host_rollups(&self) -> Result<Vec<HostRollup>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT h.id, h.name, COUNT(w.id), COALESCE(SUM(w.total_attendees), 0) AS attendees
             FROM webinar_hosts h
             LEFT JOIN webinars w ON w.host_id = h.id
             GROUP BY h.id
             ORDER BY attendees DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(HostRollup {
                host_id: row.get(0)?,
                host_name: row.get(1)?,
                webinar_count: row.get(2)?,
                total_attendees: row.get(3)?,
            })
        })?;
        let mut rollups = Vec::new();
        for row in rows {
            rollups.push(row?);
        }
        Ok(rollups)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    fn attendee(webinar_id: i64, name: &str, joined: &str) -> DbWebinarAttendee {
        DbWebinarAttendee {
            webinar_id,
            participant_name: name.to_string(),
            attendance_started_at: None,
            joined_at: Some(joined.to_string()),
            attendance_stopped_at: None,
            attended_duration: Some("30 min".to_string()),
            meeting_code: Some("abc-defg-hij".to_string()),
        }
    }

    #[test]
    fn test_get_or_create_host_is_stable() {
        let db = test_db();
        let first = db.get_or_create_host("Jane Doe").expect("create");
        let second = db.get_or_create_host("Jane Doe").expect("lookup");
        assert_eq!(first, second);

        let other = db.get_or_create_host("Sam Lee").expect("create other");
        assert_ne!(first, other);
    }

    #[test]
    fn test_attendees_insert_once_and_counts() {
        let db = test_db();
        let host = db.get_or_create_host("Jane Doe").expect("host");
        let webinar = db
            .insert_webinar("Onboarding 101", Some(host), Some("abc-defg-hij"))
            .expect("webinar");

        assert!(db
            .insert_webinar_attendee(&attendee(webinar, "Ada", "2024-01-05 17:00"))
            .expect("insert"));
        assert!(!db
            .insert_webinar_attendee(&attendee(webinar, "Ada", "2024-01-05 17:00"))
            .expect("duplicate row ignored"));
        // Ada rejoining later is a second attendance row
        assert!(db
            .insert_webinar_attendee(&attendee(webinar, "Ada", "2024-01-05 17:20"))
            .expect("rejoin"));
        assert!(db
            .insert_webinar_attendee(&attendee(webinar, "Grace", "2024-01-05 17:01"))
            .expect("insert"));

        let (total, unique) = db.webinar_attendance_counts(webinar).expect("counts");
        assert_eq!(total, 3);
        assert_eq!(unique, 2);
    }

    #[test]
    fn test_aggregate_overwrite_and_host_rollups() {
        let db = test_db();
        let host = db.get_or_create_host("Jane Doe").expect("host");
        let w1 = db.insert_webinar("Ep 1", Some(host), None).expect("w1");
        let w2 = db.insert_webinar("Ep 2", Some(host), None).expect("w2");

        db.update_webinar_aggregates(w1, 10, 9, Some("31:10")).expect("agg");
        db.update_webinar_aggregates(w2, 4, 4, Some("12:05")).expect("agg");

        let stored = db.get_webinar(w1).expect("query").expect("exists");
        assert_eq!(stored.total_attendees, 10);
        assert_eq!(stored.average_duration.as_deref(), Some("31:10"));

        let rollups = db.host_rollups().expect("rollups");
        assert_eq!(rollups.len(), 1);
        assert_eq!(rollups[0].webinar_count, 2);
        assert_eq!(rollups[0].total_attendees, 14);

        let top = db.top_webinars(1).expect("top");
        assert_eq!(top[0].id, w1);
    }
}
