//! Cron-driven sync scheduling.
//!
//! A single polling loop checks both schedules (chat, HR) once a minute.
//! Sleep/wake gaps are detected via time jumps, and runs missed inside a
//! grace period are caught up on wake. All schedules are evaluated in UTC.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use parking_lot::Mutex;
use thiserror::Error;

use crate::config::{ScheduleEntry, Schedules};
use crate::services::sync::SyncEngine;

/// Grace period for missed runs (2 hours).
const MISSED_RUN_GRACE_PERIOD_SECS: i64 = 7200;

/// Time jump threshold to detect sleep/wake (5 minutes).
const TIME_JUMP_THRESHOLD_SECS: i64 = 300;

/// Poll interval for the scheduler loop (1 minute).
const POLL_INTERVAL_SECS: u64 = 60;

/// Window around a scheduled minute in which it still counts as due.
const DUE_WINDOW_SECS: i64 = 120;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expr}': {detail}")]
    InvalidCron { expr: String, detail: String },

    #[error("No upcoming scheduled time for '{0}'")]
    NoUpcomingRun(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    Chat,
    Hr,
}

impl SyncKind {
    fn label(self) -> &'static str {
        match self {
            SyncKind::Chat => "chat",
            SyncKind::Hr => "hr",
        }
    }
}

/// Parse a 5-field cron expression. The cron crate expects 6 fields (with
/// seconds), so a leading "0" is prepended.
pub fn parse_cron(expr: &str) -> Result<Schedule, ScheduleError> {
    let full_expr = format!("0 {}", expr);
    full_expr
        .parse::<Schedule>()
        .map_err(|e| ScheduleError::InvalidCron {
            expr: expr.to_string(),
            detail: e.to_string(),
        })
}

/// True if the entry's schedule has a firing time within the due window
/// around `now` that has not already run.
fn due_now(
    entry: &ScheduleEntry,
    last_run: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<bool, ScheduleError> {
    let schedule = parse_cron(&entry.cron)?;

    let mut upcoming = schedule.after(&(now - chrono::Duration::seconds(DUE_WINDOW_SECS)));
    if let Some(next) = upcoming.next() {
        let diff = (now - next).num_seconds().abs();
        if diff < DUE_WINDOW_SECS {
            if let Some(last) = last_run {
                if (last - next).num_seconds().abs() < 60 {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
    }
    Ok(false)
}

/// The most recent firing time inside the grace period that never ran, if
/// any.
fn missed_run(
    entry: &ScheduleEntry,
    last_run: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, ScheduleError> {
    let schedule = parse_cron(&entry.cron)?;
    let grace_start = now - chrono::Duration::seconds(MISSED_RUN_GRACE_PERIOD_SECS);

    for scheduled in schedule.after(&grace_start) {
        if scheduled > now {
            break;
        }
        if let Some(last) = last_run {
            if last >= scheduled {
                continue;
            }
        }
        return Ok(Some(scheduled));
    }
    Ok(None)
}

/// Next firing time for an entry.
pub fn get_next_run_time(entry: &ScheduleEntry) -> Result<DateTime<Utc>, ScheduleError> {
    let schedule = parse_cron(&entry.cron)?;
    schedule
        .upcoming(Utc)
        .next()
        .ok_or_else(|| ScheduleError::NoUpcomingRun(entry.cron.clone()))
}

/// Drives the sync engine from the configured cron schedules.
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    schedules: Schedules,
    last_runs: Mutex<HashMap<SyncKind, DateTime<Utc>>>,
}

impl SyncScheduler {
    pub fn new(engine: Arc<SyncEngine>, schedules: Schedules) -> Self {
        Self {
            engine,
            schedules,
            last_runs: Mutex::new(HashMap::new()),
        }
    }

    /// Run the scheduler loop. Never returns.
    pub async fn run(&self) {
        let mut last_check = Utc::now();

        loop {
            tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;
            let now = Utc::now();

            let time_jump = (now - last_check).num_seconds();
            if time_jump > TIME_JUMP_THRESHOLD_SECS {
                log::info!(
                    "Detected system wake (time jumped {} seconds), checking for missed runs",
                    time_jump
                );
                self.check_missed_runs(now).await;
            }

            self.check_due_runs(now).await;
            last_check = now;
        }
    }

    fn entry(&self, kind: SyncKind) -> &ScheduleEntry {
        match kind {
            SyncKind::Chat => &self.schedules.chat,
            SyncKind::Hr => &self.schedules.hr,
        }
    }

    fn last_run(&self, kind: SyncKind) -> Option<DateTime<Utc>> {
        self.last_runs.lock().get(&kind).copied()
    }

    async fn check_due_runs(&self, now: DateTime<Utc>) {
        for kind in [SyncKind::Chat, SyncKind::Hr] {
            let entry = self.entry(kind);
            if !entry.enabled {
                continue;
            }
            match due_now(entry, self.last_run(kind), now) {
                Ok(true) => self.run_sync(kind, now).await,
                Ok(false) => {}
                Err(e) => log::warn!("Bad {} schedule: {}", kind.label(), e),
            }
        }
    }

    async fn check_missed_runs(&self, now: DateTime<Utc>) {
        for kind in [SyncKind::Chat, SyncKind::Hr] {
            let entry = self.entry(kind);
            if !entry.enabled {
                continue;
            }
            match missed_run(entry, self.last_run(kind), now) {
                Ok(Some(scheduled)) => {
                    log::info!(
                        "Found missed {} sync scheduled at {}, running now",
                        kind.label(),
                        scheduled
                    );
                    self.run_sync(kind, now).await;
                }
                Ok(None) => {}
                Err(e) => log::warn!("Bad {} schedule: {}", kind.label(), e),
            }
        }
    }

    async fn run_sync(&self, kind: SyncKind, now: DateTime<Utc>) {
        self.last_runs.lock().insert(kind, now);

        let report = match kind {
            SyncKind::Chat => self.engine.sync_all_channels().await,
            SyncKind::Hr => self.engine.sync_hr().await,
        };
        log::info!(
            "Scheduled {} sync: {}/{} scope(s) synced",
            kind.label(),
            report.scopes_synced,
            report.scopes_attempted
        );
        for error in &report.errors {
            log::warn!("  {} failed: {}", error.scope, error.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn entry(cron: &str) -> ScheduleEntry {
        ScheduleEntry {
            enabled: true,
            cron: cron.to_string(),
        }
    }

    fn at(iso: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(iso, "%Y-%m-%d %H:%M:%S")
            .expect("valid time")
            .and_utc()
    }

    #[test]
    fn test_parse_cron_hourly() {
        assert!(parse_cron("0 * * * *").is_ok());
    }

    #[test]
    fn test_parse_cron_every_four_hours() {
        assert!(parse_cron("0 */4 * * *").is_ok());
    }

    #[test]
    fn test_parse_cron_invalid() {
        assert!(parse_cron("not a cron").is_err());
    }

    #[test]
    fn test_due_now_at_the_scheduled_minute() {
        let e = entry("0 * * * *");
        assert!(due_now(&e, None, at("2024-01-05 14:00:30")).expect("check"));
        assert!(!due_now(&e, None, at("2024-01-05 14:30:00")).expect("check"));
    }

    #[test]
    fn test_due_now_skips_already_ran() {
        let e = entry("0 * * * *");
        let ran = Some(at("2024-01-05 14:00:10"));
        assert!(!due_now(&e, ran, at("2024-01-05 14:00:40")).expect("check"));
    }

    #[test]
    fn test_missed_run_within_grace() {
        let e = entry("0 * * * *");
        // Slept through 14:00, woke at 14:45
        let missed = missed_run(&e, Some(at("2024-01-05 13:00:05")), at("2024-01-05 14:45:00"))
            .expect("check");
        assert_eq!(missed, Some(at("2024-01-05 14:00:00")));
    }

    #[test]
    fn test_missed_run_none_when_caught_up() {
        let e = entry("0 * * * *");
        let missed = missed_run(&e, Some(at("2024-01-05 14:00:05")), at("2024-01-05 14:45:00"))
            .expect("check");
        assert_eq!(missed, None);
    }

    #[test]
    fn test_get_next_run_time() {
        assert!(get_next_run_time(&entry("0 8 * * 1-5")).is_ok());
        assert!(get_next_run_time(&entry("bogus")).is_err());
    }
}
