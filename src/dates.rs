//! Calendar-day windows for rollup computation.
//!
//! The aggregation engine walks explicit date windows in Rust rather than
//! generating date series in SQL, so dense output (one row per day, zeros
//! included) never depends on recursive CTE support.

use chrono::{NaiveDate, NaiveTime, Utc};

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The trailing window ending today (UTC): `days` calendar days, today included.
    pub fn trailing_days(days: i64) -> Self {
        let end = Utc::now().date_naive();
        let start = end - chrono::Duration::days(days.max(1) - 1);
        Self { start, end }
    }

    /// Number of days in the window (inclusive of both endpoints).
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Iterate the window's days in chronological order.
    pub fn iter(&self) -> DateWindowIter {
        DateWindowIter {
            next: Some(self.start),
            end: self.end,
        }
    }

    /// Window start as an ISO date string, the form stored in rollup rows.
    pub fn start_iso(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_iso(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    /// Epoch seconds at midnight UTC of the window start. Used as the oldest
    /// message timestamp when fetching from the chat source.
    pub fn start_epoch(&self) -> i64 {
        self.start.and_time(NaiveTime::MIN).and_utc().timestamp()
    }
}

pub struct DateWindowIter {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for DateWindowIter {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        if current > self.end {
            self.next = None;
            return None;
        }
        self.next = current.succ_opt();
        Some(current)
    }
}

/// ISO date string for a chat message timestamp of the form `"<epoch>.<seq>"`.
pub fn ts_to_iso_date(ts: &str) -> Option<String> {
    let secs: i64 = ts.split('.').next()?.parse().ok()?;
    let date = chrono::DateTime::from_timestamp(secs, 0)?.date_naive();
    Some(date.format("%Y-%m-%d").to_string())
}
