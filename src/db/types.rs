//! Shared type definitions for the database layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// A row from the `channels` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbChannel {
    pub id: String,
    pub name: String,
    pub is_member: bool,
    pub num_members: i64,
    pub topic: Option<String>,
    pub purpose: Option<String>,
}

/// A row from the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbUser {
    pub id: String,
    pub name: Option<String>,
    pub real_name: Option<String>,
    pub display_name: Option<String>,
    pub is_bot: bool,
    pub deleted: bool,
}

/// A row from the `messages` table. `ts` is the upstream timestamp string
/// (`"<epoch>.<seq>"`) and doubles as the natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbMessage {
    pub ts: String,
    pub channel_id: String,
    pub user_id: Option<String>,
    pub text: Option<String>,
    pub thread_ts: Option<String>,
    pub reply_count: i64,
    pub reaction_count: i64,
}

/// One reaction on a message, as written alongside its parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbReaction {
    pub name: String,
    pub count: i64,
    /// JSON array of reacting user IDs.
    pub users: Option<String>,
}

/// A row from the derived `engagement_metrics` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbEngagementMetric {
    pub channel_id: String,
    pub date: String,
    pub message_count: i64,
    pub user_count: i64,
    pub reaction_count: i64,
    pub thread_count: i64,
    pub avg_message_length: f64,
    pub engagement_score: f64,
}

/// A row from the derived `user_activity` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbUserActivity {
    pub user_id: String,
    pub channel_id: String,
    pub date: String,
    pub message_count: i64,
    pub reaction_count: i64,
    pub thread_count: i64,
    pub avg_message_length: f64,
}

/// A row from the `employees` table. `display_name` is always non-empty;
/// the normalization layer guarantees a fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbEmployee {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub manager_id: Option<String>,
    pub department: Option<String>,
    pub site: Option<String>,
    pub job_title: Option<String>,
    pub start_date: Option<String>,
    pub employment_status: Option<String>,
}

/// A row from the append-only `lifecycle_events` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbLifecycleEvent {
    pub employee_id: String,
    pub effective_date: String,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub event_type: String,
}

/// A row from the append-only `work_history` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbWorkHistory {
    pub employee_id: String,
    pub effective_date: String,
    pub department: Option<String>,
    pub site: Option<String>,
    pub manager: Option<String>,
    pub job_title: Option<String>,
}

/// A row from the `tasks` table. Status is one of `open`, `completed`,
/// `cancelled`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbTask {
    pub id: String,
    pub employee_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub list_name: Option<String>,
    pub status: String,
    pub due_date: Option<String>,
    pub created_date: Option<String>,
    pub last_updated: Option<String>,
    pub completed_date: Option<String>,
}

/// A row from the `time_off_requests` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbTimeOffRequest {
    pub request_id: String,
    pub employee_id: String,
    pub policy_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// JSON array of individual dates covered by the request.
    pub dates: Option<String>,
    pub duration: Option<f64>,
    pub duration_unit: Option<String>,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub approved_at: Option<String>,
}

/// A row from the append-only `time_off_entries` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbTimeOffEntry {
    pub employee_id: String,
    pub date: String,
    pub portion: Option<String>,
    pub policy_type: Option<String>,
    pub request_id: String,
    pub approval_status: Option<String>,
}

/// A row from the `webinars` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbWebinar {
    pub id: i64,
    pub name: String,
    pub host_id: Option<i64>,
    pub meeting_code: Option<String>,
    pub total_attendees: i64,
    pub unique_attendees: i64,
    pub average_duration: Option<String>,
    pub created_at: String,
}

/// A row from the `webinar_attendees` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbWebinarAttendee {
    pub webinar_id: i64,
    pub participant_name: String,
    pub attendance_started_at: Option<String>,
    pub joined_at: Option<String>,
    pub attendance_stopped_at: Option<String>,
    pub attended_duration: Option<String>,
    pub meeting_code: Option<String>,
}
