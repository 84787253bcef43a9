//! Time-off requests and per-day out-of-office entries.
//!
//! Requests mirror the HR system (overwrite upsert). Entries are one row per
//! employee-day-request, insert-if-absent.

use rusqlite::params;

use super::types::{DbError, DbTimeOffEntry, DbTimeOffRequest};
use super::MetricsDb;

impl MetricsDb {
    pub fn upsert_time_off_request(&self, request: &DbTimeOffRequest) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT INTO time_off_requests
                (request_id, employee_id, policy_type, start_date, end_date, dates,
                 duration, duration_unit, status, reason, created_at, updated_at, approved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(request_id) DO UPDATE SET
                employee_id = excluded.employee_id,
                policy_type = excluded.policy_type,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                dates = excluded.dates,
                duration = excluded.duration,
                duration_unit = excluded.duration_unit,
                status = excluded.status,
                reason = excluded.reason,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                approved_at = excluded.approved_at",
            params![
                request.request_id,
                request.employee_id,
                request.policy_type,
                request.start_date,
                request.end_date,
                request.dates,
                request.duration,
                request.duration_unit,
                request.status,
                request.reason,
                request.created_at,
                request.updated_at,
                request.approved_at,
            ],
        )?;
        Ok(())
    }

    /// Insert an out-of-office day if its natural key is new.
    pub fn insert_time_off_entry(&self, entry: &DbTimeOffEntry) -> Result<bool, DbError> {
        let written = self.conn_ref().execute(
            "INSERT OR IGNORE INTO time_off_entries
                (employee_id, date, portion, policy_type, request_id, approval_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.employee_id,
                entry.date,
                entry.portion,
                entry.policy_type,
                entry.request_id,
                entry.approval_status,
            ],
        )?;
        Ok(written > 0)
    }

    /// (total, approved) requests created on or after `since_date`.
    pub fn request_counts_since(&self, since_date: &str) -> Result<(i64, i64), DbError> {
        let counts = self.conn_ref().query_row(
            "SELECT COUNT(*),
                    COUNT(CASE WHEN status = 'approved' THEN 1 END)
             FROM time_off_requests
             WHERE created_at IS NOT NULL AND DATE(created_at) >= ?1",
            params![since_date],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    /// Distinct employees with an entry between `start` and `end` inclusive.
    pub fn employees_out_between(&self, start: &str, end: &str) -> Result<i64, DbError> {
        let count = self.conn_ref().query_row(
            "SELECT COUNT(DISTINCT employee_id) FROM time_off_entries
             WHERE date >= ?1 AND date <= ?2",
            params![start, end],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
