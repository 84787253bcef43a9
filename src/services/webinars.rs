//! Webinar CSV ingestion and attendance rollups.
//!
//! Uploads come from meeting-platform attendance exports: a header row, then
//! one row per attendance interval. Parsing is header-name driven so column
//! order does not matter. Each upload creates a new webinar record.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::db::webinars::HostRollup;
use crate::db::{DbError, DbWebinar, DbWebinarAttendee, MetricsDb};

fn re_hours() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*h").unwrap())
}

fn re_minutes() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*min").unwrap())
}

fn re_seconds() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*s").unwrap())
}

fn captured_int(re: &Regex, input: &str) -> i64 {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Parse a human duration like "46 min 35s" or "1h 2 min" into seconds.
/// Unrecognized input parses as zero.
pub fn parse_duration(duration: &str) -> i64 {
    captured_int(re_hours(), duration) * 3600
        + captured_int(re_minutes(), duration) * 60
        + captured_int(re_seconds(), duration)
}

/// Render seconds as `h:mm:ss`, or `m:ss` under an hour.
pub fn format_duration(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// One attendance row parsed out of the export.
#[derive(Debug, Clone, Default)]
pub struct ParsedAttendee {
    pub participant_name: String,
    pub attendance_started_at: Option<String>,
    pub joined_at: Option<String>,
    pub attendance_stopped_at: Option<String>,
    pub attended_duration: String,
    pub meeting_code: Option<String>,
}

fn clean_cell(cell: &str) -> String {
    cell.trim().replace('"', "")
}

/// Parse the export body. Rows missing a participant name or duration are
/// dropped, as are rows shorter than the header.
pub fn parse_attendance_csv(content: &str) -> Vec<ParsedAttendee> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let headers: Vec<String> = match lines.next() {
        Some(header_line) => header_line.split(',').map(clean_cell).collect(),
        None => return Vec::new(),
    };

    let mut attendees = Vec::new();
    for line in lines {
        let values: Vec<String> = line.split(',').map(clean_cell).collect();
        if values.len() < headers.len() {
            continue;
        }

        let mut attendee = ParsedAttendee::default();
        for (header, value) in headers.iter().zip(&values) {
            let value = value.clone();
            let optional = || Some(value.clone()).filter(|v| !v.is_empty());
            match header.to_lowercase().as_str() {
                "participant name" => attendee.participant_name = value,
                "attendance started at" => attendee.attendance_started_at = optional(),
                "joined at(beta)" => attendee.joined_at = optional(),
                "attendance stopped at" => attendee.attendance_stopped_at = optional(),
                "attended duration" => attendee.attended_duration = value,
                "meeting code" => attendee.meeting_code = optional(),
                _ => {}
            }
        }

        if !attendee.participant_name.is_empty() && !attendee.attended_duration.is_empty() {
            attendees.push(attendee);
        }
    }
    attendees
}

/// Automated note-taker bots appear as attendees in the export; drop them
/// before they inflate the counts.
fn is_note_taker(name: &str) -> bool {
    let lowered = name.to_lowercase();
    lowered.contains("fathom") && lowered.contains("notetaker")
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvUploadOutcome {
    pub webinar_id: i64,
    pub attendees_imported: usize,
    pub attendees_filtered: usize,
}

/// Ingest one attendance export as a new webinar.
///
/// Attendee insert failures are logged and skipped so one bad row never
/// loses the upload. Aggregates are recomputed from what was kept.
pub fn upload_csv(
    db: &MetricsDb,
    csv_content: &str,
    webinar_name: &str,
    host_name: &str,
) -> Result<CsvUploadOutcome, DbError> {
    let all = parse_attendance_csv(csv_content);
    let kept: Vec<&ParsedAttendee> = all.iter().filter(|a| !is_note_taker(&a.participant_name)).collect();
    let filtered = all.len() - kept.len();

    let host_id = db.get_or_create_host(host_name)?;
    let meeting_code = all.first().and_then(|a| a.meeting_code.as_deref());
    let webinar_id = db.insert_webinar(webinar_name, Some(host_id), meeting_code)?;

    let mut imported = 0;
    let mut total_seconds = 0;
    let mut names = HashSet::new();
    for attendee in &kept {
        let row = DbWebinarAttendee {
            webinar_id,
            participant_name: attendee.participant_name.clone(),
            attendance_started_at: attendee.attendance_started_at.clone(),
            joined_at: attendee.joined_at.clone(),
            attendance_stopped_at: attendee.attendance_stopped_at.clone(),
            attended_duration: Some(attendee.attended_duration.clone()),
            meeting_code: attendee.meeting_code.clone(),
        };
        match db.insert_webinar_attendee(&row) {
            Ok(true) => {
                imported += 1;
                total_seconds += parse_duration(&attendee.attended_duration);
                names.insert(attendee.participant_name.clone());
            }
            Ok(false) => {
                log::warn!(
                    "Duplicate attendance row for {} in webinar {}",
                    attendee.participant_name,
                    webinar_id
                );
            }
            Err(e) => {
                log::warn!(
                    "Skipping attendee {} in webinar {}: {}",
                    attendee.participant_name,
                    webinar_id,
                    e
                );
            }
        }
    }

    let average = if imported > 0 {
        format_duration(total_seconds / imported as i64)
    } else {
        "0:00".to_string()
    };
    db.update_webinar_aggregates(webinar_id, imported as i64, names.len() as i64, Some(&average))?;

    log::info!(
        "Imported webinar '{}': {} attendee(s), {} filtered",
        webinar_name,
        imported,
        filtered
    );

    Ok(CsvUploadOutcome {
        webinar_id,
        attendees_imported: imported,
        attendees_filtered: filtered,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebinarSummary {
    pub id: i64,
    pub name: String,
    pub host: String,
    pub meeting_code: Option<String>,
    pub total_attendees: i64,
    pub unique_attendees: i64,
    pub average_duration: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebinarStats {
    pub total_webinars: i64,
    pub total_attendees: i64,
    pub average_attendance_per_webinar: i64,
    pub most_popular_host: Option<String>,
    pub top_webinars_by_attendance: Vec<WebinarSummary>,
    pub recent_webinars: Vec<WebinarSummary>,
}

const STATS_LIST_LIMIT: usize = 5;

fn summarize(db: &MetricsDb, webinar: DbWebinar) -> Result<WebinarSummary, DbError> {
    let host = match webinar.host_id {
        Some(host_id) => db.host_name(host_id)?,
        None => None,
    };
    Ok(WebinarSummary {
        id: webinar.id,
        name: webinar.name,
        host: host.unwrap_or_else(|| "Unknown Host".to_string()),
        meeting_code: webinar.meeting_code,
        total_attendees: webinar.total_attendees,
        unique_attendees: webinar.unique_attendees,
        average_duration: webinar.average_duration,
        created_at: webinar.created_at,
    })
}

pub fn list_webinars(db: &MetricsDb) -> Result<Vec<WebinarSummary>, DbError> {
    db.list_webinars()?
        .into_iter()
        .map(|w| summarize(db, w))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebinarDetail {
    #[serde(flatten)]
    pub summary: WebinarSummary,
    pub attendees: Vec<DbWebinarAttendee>,
}

pub fn get_webinar(db: &MetricsDb, id: i64) -> Result<Option<WebinarDetail>, DbError> {
    match db.get_webinar(id)? {
        Some(webinar) => Ok(Some(WebinarDetail {
            summary: summarize(db, webinar)?,
            attendees: db.webinar_attendees(id)?,
        })),
        None => Ok(None),
    }
}

pub fn get_webinar_hosts(db: &MetricsDb) -> Result<Vec<HostRollup>, DbError> {
    db.host_rollups()
}

pub fn delete_webinar(db: &MetricsDb, id: i64) -> Result<(), DbError> {
    db.delete_webinar(id)
}

/// Cross-webinar stats: totals, busiest host, top and recent lists.
pub fn get_webinar_stats(db: &MetricsDb) -> Result<WebinarStats, DbError> {
    let all = db.list_webinars()?;
    let total_webinars = all.len() as i64;
    let total_attendees: i64 = all.iter().map(|w| w.total_attendees).sum();
    let average_attendance_per_webinar = if total_webinars > 0 {
        (total_attendees as f64 / total_webinars as f64).round() as i64
    } else {
        0
    };

    let most_popular_host = db
        .host_rollups()?
        .into_iter()
        .find(|h| h.webinar_count > 0)
        .map(|h| h.host_name);

    let top_webinars_by_attendance = db
        .top_webinars(STATS_LIST_LIMIT)?
        .into_iter()
        .map(|w| summarize(db, w))
        .collect::<Result<Vec<_>, _>>()?;
    let recent_webinars = all
        .into_iter()
        .take(STATS_LIST_LIMIT)
        .map(|w| summarize(db, w))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WebinarStats {
        total_webinars,
        total_attendees,
        average_attendance_per_webinar,
        most_popular_host,
        top_webinars_by_attendance,
        recent_webinars,
    })
}
