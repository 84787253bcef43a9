//! HR task storage and rollup queries.

use rusqlite::params;

use super::types::{DbError, DbTask};
use super::MetricsDb;

/// Per-department task rollup.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentTasks {
    pub department: String,
    pub total: i64,
    pub completed: i64,
    pub completion_rate: f64,
}

impl MetricsDb {
    pub fn upsert_task(&self, task: &DbTask) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT INTO tasks
                (id, employee_id, title, description, list_name, status,
                 due_date, created_date, last_updated, completed_date, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                employee_id = excluded.employee_id,
                title = excluded.title,
                description = excluded.description,
                list_name = excluded.list_name,
                status = excluded.status,
                due_date = excluded.due_date,
                created_date = excluded.created_date,
                last_updated = excluded.last_updated,
                completed_date = excluded.completed_date,
                updated_at = excluded.updated_at",
            params![
                task.id,
                task.employee_id,
                task.title,
                task.description,
                task.list_name,
                task.status,
                task.due_date,
                task.created_date,
                task.last_updated,
                task.completed_date,
            ],
        )?;
        Ok(())
    }

    pub fn upsert_tasks(&self, tasks: &[DbTask]) -> Result<usize, DbError> {
        let mut written = 0;
        for task in tasks {
            match self.upsert_task(task) {
                Ok(()) => written += 1,
                Err(e) => log::warn!("Skipping task {}: {}", task.id, e),
            }
        }
        Ok(written)
    }

    pub fn open_task_count(&self) -> Result<i64, DbError> {
        let count = self.conn_ref().query_row(
            "SELECT COUNT(*) FROM tasks WHERE status = 'open'",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Open tasks whose due date is strictly before `today`.
    pub fn overdue_task_count(&self, today: &str) -> Result<i64, DbError> {
        let count = self.conn_ref().query_row(
            "SELECT COUNT(*) FROM tasks
             WHERE status = 'open' AND due_date IS NOT NULL AND due_date < ?1",
            params![today],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Open tasks due between `today` and `horizon` inclusive.
    pub fn due_soon_count(&self, today: &str, horizon: &str) -> Result<i64, DbError> {
        let count = self.conn_ref().query_row(
            "SELECT COUNT(*) FROM tasks
             WHERE status = 'open'
               AND due_date IS NOT NULL
               AND due_date >= ?1 AND due_date <= ?2",
            params![today, horizon],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// (completed, total) among tasks touched on or after `since_date`.
    /// Cancelled tasks count toward neither.
    pub fn completion_counts_since(&self, since_date: &str) -> Result<(i64, i64), DbError> {
        let counts = self.conn_ref().query_row(
            "SELECT COUNT(CASE WHEN status = 'completed' THEN 1 END),
                    COUNT(CASE WHEN status IN ('open', 'completed') THEN 1 END)
             FROM tasks
             WHERE last_updated IS NOT NULL AND last_updated >= ?1",
            params![since_date],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    /// Task totals and completion rates grouped by the assignee's department.
    pub fn department_task_breakdown(&self) -> Result<Vec<DepartmentTasks>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT COALESCE(e.department, 'Unknown') AS dept,
                    COUNT(*) AS total,
                    COUNT(CASE WHEN t.status = 'completed' THEN 1 END) AS completed
             FROM tasks t
             LEFT JOIN employees e ON e.id = t.employee_id
             WHERE t.status IN ('open', 'completed')
             GROUP BY dept
             ORDER BY total DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            let total: i64 = row.get(1)?;
            let completed: i64 = row.get(2)?;
            Ok(DepartmentTasks {
                department: row.get(0)?,
                total,
                completed,
                completion_rate: if total > 0 {
                    completed as f64 / total as f64 * 100.0
                } else {
                    0.0
                },
            })
        })?;
        let mut breakdown = Vec::new();
        for row in rows {
            breakdown.push(row?);
        }
        Ok(breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    pub(crate) fn task(id: &str, status: &str, due: Option<&str>) -> DbTask {
        DbTask {
            id: id.to_string(),
            employee_id: Some("E1".to_string()),
            title: format!("Task {id}"),
            description: None,
            list_name: Some("onboarding".to_string()),
            status: status.to_string(),
            due_date: due.map(|d| d.to_string()),
            created_date: Some("2024-01-01".to_string()),
            last_updated: Some("2024-01-10".to_string()),
            completed_date: None,
        }
    }

    #[test]
    fn test_upsert_task_overwrites() {
        let db = test_db();

        let mut t = task("T1", "open", Some("2024-02-01"));
        db.upsert_task(&t).expect("insert");
        t.status = "completed".to_string();
        t.completed_date = Some("2024-01-20".to_string());
        db.upsert_task(&t).expect("overwrite");

        assert_eq!(db.open_task_count().expect("count"), 0);
    }

    #[test]
    fn test_overdue_and_due_soon() {
        let db = test_db();

        db.upsert_task(&task("T1", "open", Some("2024-01-10")))
            .expect("overdue");
        db.upsert_task(&task("T2", "open", Some("2024-01-18")))
            .expect("due soon");
        db.upsert_task(&task("T3", "open", Some("2024-03-01")))
            .expect("far out");
        db.upsert_task(&task("T4", "completed", Some("2024-01-10")))
            .expect("done, never overdue");
        db.upsert_task(&task("T5", "open", None)).expect("no due date");

        assert_eq!(db.overdue_task_count("2024-01-15").expect("overdue"), 1);
        assert_eq!(
            db.due_soon_count("2024-01-15", "2024-01-22").expect("soon"),
            1
        );
    }

    #[test]
    fn test_completion_counts_excludes_cancelled() {
        let db = test_db();

        db.upsert_task(&task("T1", "completed", None)).expect("t1");
        db.upsert_task(&task("T2", "open", None)).expect("t2");
        db.upsert_task(&task("T3", "cancelled", None)).expect("t3");
        let mut old = task("T4", "completed", None);
        old.last_updated = Some("2020-01-01".to_string());
        db.upsert_task(&old).expect("t4 outside window");

        let (completed, total) = db.completion_counts_since("2024-01-01").expect("counts");
        assert_eq!(completed, 1);
        assert_eq!(total, 2);
    }

    #[test]
    fn test_department_breakdown_joins_employees() {
        let db = test_db();

        db.upsert_employee(&crate::db::DbEmployee {
            id: "E1".to_string(),
            display_name: "Jane".to_string(),
            email: None,
            manager_id: None,
            department: Some("Engineering".to_string()),
            site: None,
            job_title: None,
            start_date: None,
            employment_status: Some("Employed".to_string()),
        })
        .expect("employee");

        db.upsert_task(&task("T1", "completed", None)).expect("t1");
        db.upsert_task(&task("T2", "open", None)).expect("t2");
        let mut unassigned = task("T3", "open", None);
        unassigned.employee_id = None;
        db.upsert_task(&unassigned).expect("t3");

        let breakdown = db.department_task_breakdown().expect("breakdown");
        let eng = breakdown
            .iter()
            .find(|d| d.department == "Engineering")
            .expect("engineering row");
        assert_eq!(eng.total, 2);
        assert_eq!(eng.completed, 1);
        assert_eq!(eng.completion_rate, 50.0);
        assert!(breakdown.iter().any(|d| d.department == "Unknown"));
    }
}
