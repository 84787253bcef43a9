//! Source adapter traits and the record shapes they emit.
//!
//! Adapters wrap the upstream APIs (chat platform, HR platform) behind async
//! traits so the sync engine never sees transport details. Records carry the
//! upstream payload shapes, optional variants included; `normalize` turns
//! them into the fixed shapes the store accepts.

use async_trait::async_trait;

use crate::error::AdapterError;

pub mod normalize;

/// A channel as described by the chat source.
#[derive(Debug, Clone)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    pub is_member: bool,
    pub num_members: i64,
    pub topic: Option<String>,
    pub purpose: Option<String>,
}

/// A user profile from the chat source.
#[derive(Debug, Clone, Default)]
pub struct UserRecord {
    pub id: String,
    pub name: Option<String>,
    pub real_name: Option<String>,
    pub display_name: Option<String>,
    pub is_bot: bool,
    pub deleted: bool,
}

#[derive(Debug, Clone)]
pub struct ReactionRecord {
    pub name: String,
    pub count: i64,
    pub users: Vec<String>,
}

/// A message from channel history. `reaction_count` is derived from
/// `reactions` during normalization, not trusted from upstream.
#[derive(Debug, Clone, Default)]
pub struct MessageRecord {
    pub ts: String,
    pub user_id: Option<String>,
    pub text: Option<String>,
    pub thread_ts: Option<String>,
    pub reply_count: i64,
    pub reactions: Vec<ReactionRecord>,
}

/// Nested work block some HR payload variants carry.
#[derive(Debug, Clone, Default)]
pub struct WorkInfo {
    pub department: Option<String>,
    pub site: Option<String>,
    pub title: Option<String>,
    pub start_date: Option<String>,
    pub reports_to: Option<String>,
}

/// Nested employment block some HR payload variants carry.
#[derive(Debug, Clone, Default)]
pub struct EmploymentInfo {
    pub status: Option<String>,
    pub start_date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LifecycleEventRecord {
    pub effective_date: String,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub event_type: String,
}

#[derive(Debug, Clone)]
pub struct WorkHistoryRecord {
    pub effective_date: String,
    pub department: Option<String>,
    pub site: Option<String>,
    pub manager: Option<String>,
    pub job_title: Option<String>,
}

/// An employee as the HR source sends it. Name and org fields appear in
/// several variants depending on the API endpoint; normalization coalesces
/// them.
#[derive(Debug, Clone, Default)]
pub struct EmployeeRecord {
    pub id: String,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub manager_id: Option<String>,
    pub department: Option<String>,
    pub site: Option<String>,
    pub job_title: Option<String>,
    pub start_date: Option<String>,
    pub employment_status: Option<String>,
    pub work: Option<WorkInfo>,
    pub employment: Option<EmploymentInfo>,
    pub lifecycle_events: Vec<LifecycleEventRecord>,
    pub work_history: Vec<WorkHistoryRecord>,
}

#[derive(Debug, Clone)]
pub struct TaskRecord {
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

#[derive(Debug, Clone)]
pub struct TimeOffRequestRecord {
    pub request_id: String,
    pub employee_id: String,
    pub policy_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub dates: Vec<String>,
    pub duration: Option<f64>,
    pub duration_unit: Option<String>,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub approved_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TimeOffEntryRecord {
    pub employee_id: String,
    pub date: String,
    pub portion: Option<String>,
    pub policy_type: Option<String>,
    pub request_id: String,
    pub approval_status: Option<String>,
}

/// Read access to the chat platform.
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Channel metadata, or `None` if the channel does not exist.
    async fn channel_info(&self, channel_id: &str) -> Result<Option<ChannelRecord>, AdapterError>;

    async fn list_channels(&self) -> Result<Vec<ChannelRecord>, AdapterError>;

    async fn list_users(&self) -> Result<Vec<UserRecord>, AdapterError>;

    /// Channel history no older than `oldest_ts` (an epoch-seconds string).
    /// Returns `SourceUnavailable` when the integration is not a member.
    async fn channel_messages(
        &self,
        channel_id: &str,
        oldest_ts: &str,
    ) -> Result<Vec<MessageRecord>, AdapterError>;
}

/// Read access to the HR platform.
#[async_trait]
pub trait HrAdapter: Send + Sync {
    /// All employees, each with its lifecycle events and work history.
    async fn employees(&self) -> Result<Vec<EmployeeRecord>, AdapterError>;

    async fn tasks(&self) -> Result<Vec<TaskRecord>, AdapterError>;

    /// Requests changed on or after `since` (ISO date).
    async fn time_off_requests(&self, since: &str) -> Result<Vec<TimeOffRequestRecord>, AdapterError>;

    /// Out-of-office days between `from` and `to` inclusive (ISO dates).
    async fn out_of_office(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<TimeOffEntryRecord>, AdapterError>;
}
