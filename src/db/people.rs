//! Employee records, lifecycle events, and work history.
//!
//! Employees are a mirror of the HR system: overwrite upsert, last sync wins.
//! Lifecycle events and work history are historical facts: insert-if-absent,
//! a later sync never rewrites what the first one recorded.

use rusqlite::{params, Row};

use super::types::{DbEmployee, DbError, DbLifecycleEvent, DbWorkHistory};
use super::MetricsDb;

/// Count per group label, for department/site headcount breakdowns.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCount {
    pub label: String,
    pub count: i64,
}

/// Lifecycle statuses that mark a departure.
const LEAVER_STATUSES: &str = "('Terminated', 'Resigned')";

fn map_employee_row(row: &Row) -> rusqlite::Result<DbEmployee> {
    Ok(DbEmployee {
        id: row.get(0)?,
        display_name: row.get(1)?,
        email: row.get(2)?,
        manager_id: row.get(3)?,
        department: row.get(4)?,
        site: row.get(5)?,
        job_title: row.get(6)?,
        start_date: row.get(7)?,
        employment_status: row.get(8)?,
    })
}

impl MetricsDb {
    pub fn upsert_employee(&self, employee: &DbEmployee) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT INTO employees
                (id, display_name, email, manager_id, department, site,
                 job_title, start_date, employment_status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                email = excluded.email,
                manager_id = excluded.manager_id,
                department = excluded.department,
                site = excluded.site,
                job_title = excluded.job_title,
                start_date = excluded.start_date,
                employment_status = excluded.employment_status,
                updated_at = excluded.updated_at",
            params![
                employee.id,
                employee.display_name,
                employee.email,
                employee.manager_id,
                employee.department,
                employee.site,
                employee.job_title,
                employee.start_date,
                employee.employment_status,
            ],
        )?;
        Ok(())
    }

    pub fn get_employee(&self, id: &str) -> Result<Option<DbEmployee>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, display_name, email, manager_id, department, site,
                    job_title, start_date, employment_status
             FROM employees WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], map_employee_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Insert a lifecycle event if its natural key is new. Returns true if a
    /// row was written.
    pub fn insert_lifecycle_event(&self, event: &DbLifecycleEvent) -> Result<bool, DbError> {
        let written = self.conn_ref().execute(
            "INSERT OR IGNORE INTO lifecycle_events
                (employee_id, effective_date, status, reason, event_type)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.employee_id,
                event.effective_date,
                event.status,
                event.reason,
                event.event_type,
            ],
        )?;
        Ok(written > 0)
    }

    /// Insert a work-history row if its natural key is new.
    pub fn insert_work_history(&self, entry: &DbWorkHistory) -> Result<bool, DbError> {
        let written = self.conn_ref().execute(
            "INSERT OR IGNORE INTO work_history
                (employee_id, effective_date, department, site, manager, job_title)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.employee_id,
                entry.effective_date,
                entry.department,
                entry.site,
                entry.manager,
                entry.job_title,
            ],
        )?;
        Ok(written > 0)
    }

    pub fn total_employed(&self) -> Result<i64, DbError> {
        let count = self.conn_ref().query_row(
            "SELECT COUNT(*) FROM employees WHERE employment_status = 'Employed'",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Employees whose start date falls on or after `since_date`.
    pub fn joiners_since(&self, since_date: &str) -> Result<i64, DbError> {
        let count = self.conn_ref().query_row(
            "SELECT COUNT(*) FROM employees
             WHERE start_date IS NOT NULL AND start_date >= ?1",
            params![since_date],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Departure events effective on or after `since_date`.
    pub fn leavers_since(&self, since_date: &str) -> Result<i64, DbError> {
        let count = self.conn_ref().query_row(
            &format!(
                "SELECT COUNT(DISTINCT employee_id) FROM lifecycle_events
                 WHERE status IN {LEAVER_STATUSES} AND effective_date >= ?1"
            ),
            params![since_date],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn headcount_by_department(&self) -> Result<Vec<GroupCount>, DbError> {
        self.headcount_grouped_by("department")
    }

    pub fn headcount_by_site(&self) -> Result<Vec<GroupCount>, DbError> {
        self.headcount_grouped_by("site")
    }

    fn headcount_grouped_by(&self, column: &str) -> Result<Vec<GroupCount>, DbError> {
        // column is a compile-time constant from the two callers above
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT COALESCE({column}, 'Unknown'), COUNT(*)
             FROM employees
             WHERE employment_status = 'Employed'
             GROUP BY COALESCE({column}, 'Unknown')
             ORDER BY COUNT(*) DESC"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(GroupCount {
                label: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        let mut groups = Vec::new();
        for row in rows {
            groups.push(row?);
        }
        Ok(groups)
    }
}
