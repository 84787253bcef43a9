//! Workforce dashboard rollups: headcount, tasks, and time off.

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::db::people::GroupCount;
use crate::db::tasks::DepartmentTasks;
use crate::db::{DbError, MetricsDb};

const DUE_SOON_DAYS: i64 = 7;
const OUT_LOOKAHEAD_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadcountMetrics {
    pub total: i64,
    pub joiners_30d: i64,
    pub joiners_90d: i64,
    pub leavers_30d: i64,
    pub leavers_90d: i64,
    pub by_department: Vec<GroupCount>,
    pub by_site: Vec<GroupCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetrics {
    pub open: i64,
    pub overdue: i64,
    pub due_soon: i64,
    pub completion_rate_30d: f64,
    pub by_department: Vec<DepartmentTasks>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOffMetrics {
    pub requests_30d: i64,
    pub approval_rate_30d: f64,
    pub out_today: i64,
    pub out_this_week: i64,
    pub out_next_30_days: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub headcount: HeadcountMetrics,
    pub tasks: TaskMetrics,
    pub time_off: TimeOffMetrics,
}

fn iso(days_from_now: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days_from_now))
        .format("%Y-%m-%d")
        .to_string()
}

/// One dashboard snapshot over the current store. All windows are anchored
/// at today (UTC).
pub fn get_dashboard_metrics(db: &MetricsDb) -> Result<DashboardMetrics, DbError> {
    let today = iso(0);
    let since_30d = iso(-30);
    let since_90d = iso(-90);

    let headcount = HeadcountMetrics {
        total: db.total_employed()?,
        joiners_30d: db.joiners_since(&since_30d)?,
        joiners_90d: db.joiners_since(&since_90d)?,
        leavers_30d: db.leavers_since(&since_30d)?,
        leavers_90d: db.leavers_since(&since_90d)?,
        by_department: db.headcount_by_department()?,
        by_site: db.headcount_by_site()?,
    };

    let (completed, total) = db.completion_counts_since(&since_30d)?;
    let tasks = TaskMetrics {
        open: db.open_task_count()?,
        overdue: db.overdue_task_count(&today)?,
        due_soon: db.due_soon_count(&today, &iso(DUE_SOON_DAYS))?,
        completion_rate_30d: if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        },
        by_department: db.department_task_breakdown()?,
    };

    let (requests, approved) = db.request_counts_since(&since_30d)?;
    let time_off = TimeOffMetrics {
        requests_30d: requests,
        approval_rate_30d: if requests > 0 {
            approved as f64 / requests as f64 * 100.0
        } else {
            0.0
        },
        out_today: db.employees_out_between(&today, &today)?,
        out_this_week: db.employees_out_between(&today, &iso(6))?,
        out_next_30_days: db.employees_out_between(&today, &iso(OUT_LOOKAHEAD_DAYS))?,
    };

    Ok(DashboardMetrics {
        headcount,
        tasks,
        time_off,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use crate::db::{DbEmployee, DbLifecycleEvent, DbTask, DbTimeOffEntry, DbTimeOffRequest};

    fn employee(id: &str, department: &str, start: &str) -> DbEmployee {
        DbEmployee {
            id: id.to_string(),
            display_name: format!("Employee {id}"),
            email: None,
            manager_id: None,
            department: Some(department.to_string()),
            site: Some("Remote".to_string()),
            job_title: None,
            start_date: Some(start.to_string()),
            employment_status: Some("Employed".to_string()),
        }
    }

    fn task(id: &str, status: &str, due: Option<String>, updated: &str) -> DbTask {
        DbTask {
            id: id.to_string(),
            employee_id: Some("E1".to_string()),
            title: format!("Task {id}"),
            description: None,
            list_name: None,
            status: status.to_string(),
            due_date: due,
            created_date: None,
            last_updated: Some(updated.to_string()),
            completed_date: None,
        }
    }

    #[test]
    fn test_empty_store_yields_zeroed_dashboard() {
        let db = test_db();
        let dashboard = get_dashboard_metrics(&db).expect("dashboard");
        assert_eq!(dashboard.headcount.total, 0);
        assert_eq!(dashboard.tasks.open, 0);
        assert_eq!(dashboard.tasks.completion_rate_30d, 0.0);
        assert_eq!(dashboard.time_off.approval_rate_30d, 0.0);
    }

    #[test]
    fn test_headcount_windows() {
        let db = test_db();

        db.upsert_employee(&employee("E1", "Engineering", &iso(-10)))
            .expect("recent joiner");
        db.upsert_employee(&employee("E2", "Engineering", &iso(-60)))
            .expect("older joiner");
        db.upsert_employee(&employee("E3", "Sales", "2020-01-01"))
            .expect("long tenured");

        db.insert_lifecycle_event(&DbLifecycleEvent {
            employee_id: "E3".to_string(),
            effective_date: iso(-5),
            status: Some("Resigned".to_string()),
            reason: None,
            event_type: "termination".to_string(),
        })
        .expect("event");

        let dashboard = get_dashboard_metrics(&db).expect("dashboard");
        assert_eq!(dashboard.headcount.total, 3);
        assert_eq!(dashboard.headcount.joiners_30d, 1);
        assert_eq!(dashboard.headcount.joiners_90d, 2);
        assert_eq!(dashboard.headcount.leavers_30d, 1);
        assert!(dashboard
            .headcount
            .by_department
            .iter()
            .any(|g| g.label == "Engineering" && g.count == 2));
    }

    #[test]
    fn test_task_metrics_windows_and_rate() {
        let db = test_db();

        db.upsert_task(&task("T1", "open", Some(iso(-3)), &iso(-1)))
            .expect("overdue");
        db.upsert_task(&task("T2", "open", Some(iso(2)), &iso(-1)))
            .expect("due soon");
        db.upsert_task(&task("T3", "open", Some(iso(20)), &iso(-1)))
            .expect("far out");
        db.upsert_task(&task("T4", "completed", None, &iso(-1)))
            .expect("completed");
        db.upsert_task(&task("T5", "cancelled", None, &iso(-1)))
            .expect("cancelled");

        let dashboard = get_dashboard_metrics(&db).expect("dashboard");
        assert_eq!(dashboard.tasks.open, 3);
        assert_eq!(dashboard.tasks.overdue, 1);
        assert_eq!(dashboard.tasks.due_soon, 1);
        // 1 completed of 4 open-or-completed in the window
        assert_eq!(dashboard.tasks.completion_rate_30d, 25.0);
    }

    #[test]
    fn test_time_off_metrics() {
        let db = test_db();

        for (id, status) in [("R1", "approved"), ("R2", "approved"), ("R3", "pending")] {
            db.upsert_time_off_request(&DbTimeOffRequest {
                request_id: id.to_string(),
                employee_id: "E1".to_string(),
                policy_type: None,
                start_date: None,
                end_date: None,
                dates: None,
                duration: None,
                duration_unit: None,
                status: Some(status.to_string()),
                reason: None,
                created_at: Some(format!("{}T10:00:00Z", iso(-2))),
                updated_at: None,
                approved_at: None,
            })
            .expect("request");
        }

        db.insert_time_off_entry(&DbTimeOffEntry {
            employee_id: "E1".to_string(),
            date: iso(0),
            portion: None,
            policy_type: None,
            request_id: "R1".to_string(),
            approval_status: Some("approved".to_string()),
        })
        .expect("today");
        db.insert_time_off_entry(&DbTimeOffEntry {
            employee_id: "E2".to_string(),
            date: iso(10),
            portion: None,
            policy_type: None,
            request_id: "R2".to_string(),
            approval_status: Some("approved".to_string()),
        })
        .expect("later this month");

        let dashboard = get_dashboard_metrics(&db).expect("dashboard");
        assert_eq!(dashboard.time_off.requests_30d, 3);
        assert!((dashboard.time_off.approval_rate_30d - 66.666).abs() < 0.01);
        assert_eq!(dashboard.time_off.out_today, 1);
        assert_eq!(dashboard.time_off.out_this_week, 1);
        assert_eq!(dashboard.time_off.out_next_30_days, 2);
    }
}
