//! Sync orchestration across chat and HR sources.
//!
//! Each scope (a channel, employees, tasks, time off) syncs independently:
//! one scope failing is recorded in the report and the rest continue. The
//! store only changes after a scope's fetch succeeded, so a dashboard reads
//! either the previous sync or the new one, never a half-fetched state.

use std::sync::Arc;

use chrono::{Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::adapters::normalize;
use crate::adapters::{ChatAdapter, HrAdapter, TimeOffRequestRecord};
use crate::dates::DateWindow;
use crate::db::{
    DbLifecycleEvent, DbTask, DbTimeOffEntry, DbTimeOffRequest, DbWorkHistory, MetricsDb,
};
use crate::error::SyncError;
use crate::services::engagement;

/// Days of time-off requests to backfill each sync.
const TIME_OFF_LOOKBACK_DAYS: i64 = 30;
/// Days of out-of-office entries to fetch ahead.
const OUT_OF_OFFICE_LOOKAHEAD_DAYS: i64 = 7;

/// Pipeline state for a sync run. Each scope moves through
/// `Fetching → Upserting → Aggregating` in order; the report starts `Idle`
/// and settles to `Done` or `PartiallyFailed` when the run returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncPhase {
    Idle,
    Fetching,
    Upserting,
    Aggregating,
    Done,
    PartiallyFailed,
}

/// One scope's failure, kept human-readable for the report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeError {
    pub scope: String,
    pub message: String,
    pub retryable: bool,
    pub recovery_suggestion: Option<String>,
}

impl ScopeError {
    fn new(scope: &str, error: &SyncError) -> Self {
        Self {
            scope: scope.to_string(),
            message: error.to_string(),
            retryable: error.is_retryable(),
            recovery_suggestion: error.recovery_suggestion(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// `Idle` while the run is in flight, settled to `outcome()` on return.
    pub phase: SyncPhase,
    pub scopes_attempted: usize,
    pub scopes_synced: usize,
    pub errors: Vec<ScopeError>,
}

impl SyncReport {
    fn new() -> Self {
        Self {
            phase: SyncPhase::Idle,
            scopes_attempted: 0,
            scopes_synced: 0,
            errors: Vec::new(),
        }
    }

    fn record<T>(&mut self, scope: &str, result: Result<T, SyncError>) {
        self.scopes_attempted += 1;
        match result {
            Ok(_) => self.scopes_synced += 1,
            Err(e) => {
                log::warn!("Sync scope {} failed: {}", scope, e);
                self.errors.push(ScopeError::new(scope, &e));
            }
        }
    }

    fn merge(&mut self, other: SyncReport) {
        self.scopes_attempted += other.scopes_attempted;
        self.scopes_synced += other.scopes_synced;
        self.errors.extend(other.errors);
    }

    pub fn outcome(&self) -> SyncPhase {
        if self.errors.is_empty() {
            SyncPhase::Done
        } else {
            SyncPhase::PartiallyFailed
        }
    }

    fn settle(mut self) -> Self {
        self.phase = self.outcome();
        self
    }
}

/// Orchestrates fetch, upsert, and recompute across both sources.
///
/// The store is behind a mutex so the engine can be driven from the
/// scheduler and an on-demand trigger at once; locks are held only for the
/// upsert-and-recompute section, never across adapter calls.
pub struct SyncEngine {
    db: Arc<Mutex<MetricsDb>>,
    chat: Arc<dyn ChatAdapter>,
    hr: Arc<dyn HrAdapter>,
    window_days: i64,
}

impl SyncEngine {
    pub fn new(
        db: Arc<Mutex<MetricsDb>>,
        chat: Arc<dyn ChatAdapter>,
        hr: Arc<dyn HrAdapter>,
        window_days: i64,
    ) -> Self {
        Self {
            db,
            chat,
            hr,
            window_days,
        }
    }

    /// Sync one channel: metadata, users, messages, then rollups.
    pub async fn sync_channel(&self, channel_id: &str) -> Result<usize, SyncError> {
        let window = DateWindow::trailing_days(self.window_days);

        log::debug!("Channel {}: {:?}", channel_id, SyncPhase::Fetching);
        let channel = self
            .chat
            .channel_info(channel_id)
            .await?
            .ok_or_else(|| SyncError::UnknownChannel(channel_id.to_string()))?;
        let users = self.chat.list_users().await?;
        let oldest = window.start_epoch().to_string();
        let messages = self.chat.channel_messages(channel_id, &oldest).await?;

        log::debug!("Channel {}: {:?}", channel_id, SyncPhase::Upserting);
        let db = self.db.lock();
        db.upsert_channel(&normalize::normalize_channel(&channel))?;
        let user_rows: Vec<_> = users.iter().map(normalize::normalize_user).collect();
        db.upsert_users(&user_rows)?;
        let message_rows: Vec<_> = messages
            .iter()
            .map(|m| normalize::normalize_message(channel_id, m))
            .collect();
        let written = db.upsert_messages(&message_rows)?;

        log::debug!("Channel {}: {:?}", channel_id, SyncPhase::Aggregating);
        engagement::recompute_channel_metrics(&db, channel_id, &window)?;
        log::info!("Synced channel {}: {} message(s)", channel_id, written);
        Ok(written)
    }

    /// Sync every channel the integration is a member of. Channels fail
    /// independently.
    pub async fn sync_all_channels(&self) -> SyncReport {
        let mut report = SyncReport::new();

        let channels = match self.chat.list_channels().await {
            Ok(channels) => channels,
            Err(e) => {
                report.record::<()>("channels", Err(e.into()));
                return report.settle();
            }
        };

        for channel in channels.iter().filter(|c| c.is_member) {
            let result = self.sync_channel(&channel.id).await;
            report.record(&format!("channel {}", channel.id), result);
        }
        report.settle()
    }

    async fn sync_employees(&self) -> Result<usize, SyncError> {
        let employees = self.hr.employees().await?;

        let db = self.db.lock();
        let mut written = 0;
        for record in &employees {
            db.upsert_employee(&normalize::normalize_employee(record))?;
            for event in &record.lifecycle_events {
                db.insert_lifecycle_event(&DbLifecycleEvent {
                    employee_id: record.id.clone(),
                    effective_date: event.effective_date.clone(),
                    status: event.status.clone(),
                    reason: event.reason.clone(),
                    event_type: event.event_type.clone(),
                })?;
            }
            for entry in &record.work_history {
                db.insert_work_history(&DbWorkHistory {
                    employee_id: record.id.clone(),
                    effective_date: entry.effective_date.clone(),
                    department: entry.department.clone(),
                    site: entry.site.clone(),
                    manager: entry.manager.clone(),
                    job_title: entry.job_title.clone(),
                })?;
            }
            written += 1;
        }
        log::info!("Synced {} employee(s)", written);
        Ok(written)
    }

    async fn sync_tasks(&self) -> Result<usize, SyncError> {
        let tasks = self.hr.tasks().await?;

        let rows: Vec<DbTask> = tasks
            .iter()
            .map(|t| DbTask {
                id: t.id.clone(),
                employee_id: t.employee_id.clone(),
                title: t.title.clone(),
                description: t.description.clone(),
                list_name: t.list_name.clone(),
                status: t.status.clone(),
                due_date: t.due_date.clone(),
                created_date: t.created_date.clone(),
                last_updated: t.last_updated.clone(),
                completed_date: t.completed_date.clone(),
            })
            .collect();

        let db = self.db.lock();
        let written = db.upsert_tasks(&rows)?;
        log::info!("Synced {} task(s)", written);
        Ok(written)
    }

    async fn sync_time_off(&self) -> Result<usize, SyncError> {
        let today = Utc::now().date_naive();
        let since = (today - Duration::days(TIME_OFF_LOOKBACK_DAYS))
            .format("%Y-%m-%d")
            .to_string();
        let until = (today + Duration::days(OUT_OF_OFFICE_LOOKAHEAD_DAYS))
            .format("%Y-%m-%d")
            .to_string();
        let from = today.format("%Y-%m-%d").to_string();

        let requests = self.hr.time_off_requests(&since).await?;
        let entries = self.hr.out_of_office(&from, &until).await?;

        let db = self.db.lock();
        let mut written = 0;
        for record in &requests {
            db.upsert_time_off_request(&request_row(record))?;
            written += 1;
        }
        for record in &entries {
            db.insert_time_off_entry(&DbTimeOffEntry {
                employee_id: record.employee_id.clone(),
                date: record.date.clone(),
                portion: record.portion.clone(),
                policy_type: record.policy_type.clone(),
                request_id: record.request_id.clone(),
                approval_status: record.approval_status.clone(),
            })?;
            written += 1;
        }
        log::info!(
            "Synced {} time-off request(s) and {} out-of-office day(s)",
            requests.len(),
            entries.len()
        );
        Ok(written)
    }

    /// Sync all HR scopes. Scopes fail independently.
    pub async fn sync_hr(&self) -> SyncReport {
        let mut report = SyncReport::new();
        report.record("employees", self.sync_employees().await);
        report.record("tasks", self.sync_tasks().await);
        report.record("timeOff", self.sync_time_off().await);
        report.settle()
    }

    /// Full sync across both sources.
    pub async fn sync_all(&self) -> SyncReport {
        let mut report = self.sync_all_channels().await;
        report.merge(self.sync_hr().await);
        report.settle()
    }
}

fn request_row(record: &TimeOffRequestRecord) -> DbTimeOffRequest {
    DbTimeOffRequest {
        request_id: record.request_id.clone(),
        employee_id: record.employee_id.clone(),
        policy_type: record.policy_type.clone(),
        start_date: record.start_date.clone(),
        end_date: record.end_date.clone(),
        dates: serde_json::to_string(&record.dates).ok(),
        duration: record.duration,
        duration_unit: record.duration_unit.clone(),
        status: record.status.clone(),
        reason: record.reason.clone(),
        created_at: record.created_at.clone(),
        updated_at: record.updated_at.clone(),
        approved_at: record.approved_at.clone(),
    }
}
