//! Normalization of upstream payload variants into store shapes.
//!
//! Everything messy about upstream data is handled here, before the upsert
//! layer: name fallbacks, nested-vs-flat org fields, derived reaction counts.

use crate::db::{DbEmployee, DbMessage, DbReaction, DbUser};

use super::{ChannelRecord, EmployeeRecord, MessageRecord, UserRecord};
use crate::db::DbChannel;

/// Resolve a non-empty display name for an employee.
///
/// Fallback chain: explicit display name, "first last", the single available
/// name part, then `Employee <last-4-of-id>` so the record is still
/// addressable in dashboards.
pub fn employee_display_name(record: &EmployeeRecord) -> String {
    if let Some(name) = non_empty(record.display_name.as_deref()) {
        return name.to_string();
    }

    let first = non_empty(record.first_name.as_deref());
    let last = non_empty(record.last_name.as_deref());
    match (first, last) {
        (Some(first), Some(last)) => format!("{} {}", first, last),
        (Some(first), None) => first.to_string(),
        (None, Some(last)) => last.to_string(),
        (None, None) => {
            let tail: String = record
                .id
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("Employee {}", tail)
        }
    }
}

/// Flatten an employee record, coalescing flat and nested field variants.
pub fn normalize_employee(record: &EmployeeRecord) -> DbEmployee {
    let work = record.work.as_ref();
    let employment = record.employment.as_ref();

    DbEmployee {
        id: record.id.clone(),
        display_name: employee_display_name(record),
        email: record.email.clone(),
        manager_id: record
            .manager_id
            .clone()
            .or_else(|| work.and_then(|w| w.reports_to.clone())),
        department: record
            .department
            .clone()
            .or_else(|| work.and_then(|w| w.department.clone())),
        site: record
            .site
            .clone()
            .or_else(|| work.and_then(|w| w.site.clone())),
        job_title: record
            .job_title
            .clone()
            .or_else(|| work.and_then(|w| w.title.clone())),
        start_date: record
            .start_date
            .clone()
            .or_else(|| employment.and_then(|e| e.start_date.clone()))
            .or_else(|| work.and_then(|w| w.start_date.clone())),
        employment_status: record
            .employment_status
            .clone()
            .or_else(|| employment.and_then(|e| e.status.clone()))
            .or_else(|| Some("Employed".to_string())),
    }
}

/// Shape a message for storage. The stored reaction count is the sum over
/// the reaction list, not an upstream field.
pub fn normalize_message(channel_id: &str, record: &MessageRecord) -> (DbMessage, Vec<DbReaction>) {
    let reaction_count: i64 = record.reactions.iter().map(|r| r.count).sum();

    let message = DbMessage {
        ts: record.ts.clone(),
        channel_id: channel_id.to_string(),
        user_id: record.user_id.clone(),
        text: record.text.clone(),
        thread_ts: record.thread_ts.clone(),
        reply_count: record.reply_count,
        reaction_count,
    };

    let reactions = record
        .reactions
        .iter()
        .map(|r| DbReaction {
            name: r.name.clone(),
            count: r.count,
            users: serde_json::to_string(&r.users).ok(),
        })
        .collect();

    (message, reactions)
}

pub fn normalize_user(record: &UserRecord) -> DbUser {
    DbUser {
        id: record.id.clone(),
        name: record.name.clone(),
        real_name: record.real_name.clone(),
        display_name: record.display_name.clone(),
        is_bot: record.is_bot,
        deleted: record.deleted,
    }
}

pub fn normalize_channel(record: &ChannelRecord) -> DbChannel {
    DbChannel {
        id: record.id.clone(),
        name: record.name.clone(),
        is_member: record.is_member,
        num_members: record.num_members,
        topic: record.topic.clone(),
        purpose: record.purpose.clone(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{EmploymentInfo, ReactionRecord, WorkInfo};

    fn employee(id: &str) -> EmployeeRecord {
        EmployeeRecord {
            id: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_display_name_prefers_explicit() {
        let mut rec = employee("E1");
        rec.display_name = Some("JD".to_string());
        rec.first_name = Some("Jane".to_string());
        rec.last_name = Some("Doe".to_string());
        assert_eq!(employee_display_name(&rec), "JD");
    }

    #[test]
    fn test_display_name_joins_parts() {
        let mut rec = employee("E1");
        rec.first_name = Some("Jane".to_string());
        rec.last_name = Some("Doe".to_string());
        assert_eq!(employee_display_name(&rec), "Jane Doe");
    }

    #[test]
    fn test_display_name_last_only() {
        let mut rec = employee("E1");
        rec.last_name = Some("Smith".to_string());
        assert_eq!(employee_display_name(&rec), "Smith");
    }

    #[test]
    fn test_display_name_synthesized_from_id() {
        let rec = employee("EMP-90210");
        assert_eq!(employee_display_name(&rec), "Employee 0210");

        // Whitespace-only names do not count
        let mut blank = employee("E7");
        blank.display_name = Some("   ".to_string());
        assert_eq!(employee_display_name(&blank), "Employee E7");
    }

    #[test]
    fn test_normalize_employee_coalesces_nested_fields() {
        let mut rec = employee("E1");
        rec.first_name = Some("Jane".to_string());
        rec.last_name = Some("Doe".to_string());
        rec.work = Some(WorkInfo {
            department: Some("Engineering".to_string()),
            site: Some("Berlin".to_string()),
            title: Some("Engineer".to_string()),
            start_date: Some("2023-06-01".to_string()),
            reports_to: Some("E9".to_string()),
        });
        rec.employment = Some(EmploymentInfo {
            status: Some("Employed".to_string()),
            start_date: None,
        });

        let emp = normalize_employee(&rec);
        assert_eq!(emp.display_name, "Jane Doe");
        assert_eq!(emp.department.as_deref(), Some("Engineering"));
        assert_eq!(emp.site.as_deref(), Some("Berlin"));
        assert_eq!(emp.manager_id.as_deref(), Some("E9"));
        assert_eq!(emp.start_date.as_deref(), Some("2023-06-01"));
    }

    #[test]
    fn test_normalize_employee_flat_fields_win() {
        let mut rec = employee("E1");
        rec.last_name = Some("Smith".to_string());
        rec.department = Some("Sales".to_string());
        rec.work = Some(WorkInfo {
            department: Some("Engineering".to_string()),
            ..Default::default()
        });

        let emp = normalize_employee(&rec);
        assert_eq!(emp.department.as_deref(), Some("Sales"));
        assert_eq!(emp.employment_status.as_deref(), Some("Employed"));
    }

    #[test]
    fn test_normalize_message_sums_reactions() {
        let record = MessageRecord {
            ts: "1704465000.000200".to_string(),
            user_id: Some("U1".to_string()),
            text: Some("hello".to_string()),
            thread_ts: None,
            reply_count: 1,
            reactions: vec![
                ReactionRecord {
                    name: "thumbsup".to_string(),
                    count: 2,
                    users: vec!["U2".to_string(), "U3".to_string()],
                },
                ReactionRecord {
                    name: "eyes".to_string(),
                    count: 3,
                    users: vec![],
                },
            ],
        };

        let (message, reactions) = normalize_message("C1", &record);
        assert_eq!(message.reaction_count, 5);
        assert_eq!(message.channel_id, "C1");
        assert_eq!(reactions.len(), 2);
        assert_eq!(reactions[0].users.as_deref(), Some(r#"["U2","U3"]"#));
    }
}
