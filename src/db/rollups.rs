//! Derived rollup storage and the analytic queries over it.
//!
//! `engagement_metrics` and `user_activity` are derived tables: the
//! aggregation engine replaces a (channel, window) slice atomically, and every
//! read here treats them as authoritative for their dates. Sparse storage:
//! days with zero messages have no row.

use rusqlite::{params, Row};

use super::types::{DbEngagementMetric, DbError, DbUserActivity};
use super::MetricsDb;

/// Workspace-wide sums over `engagement_metrics` for a window.
#[derive(Debug, Clone)]
pub struct WorkspaceTotals {
    pub total_channels: i64,
    pub total_messages: i64,
    pub total_reactions: i64,
    /// Simple mean of per-row daily scores (a mean of means).
    pub avg_engagement_score: f64,
}

/// Workspace sums for a single day, active users counted distinctly.
#[derive(Debug, Clone)]
pub struct DailySums {
    pub date: String,
    pub message_count: i64,
    pub active_users: i64,
    pub reaction_count: i64,
    pub thread_count: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelBreakdownRow {
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub message_count: i64,
    pub user_count: i64,
    pub avg_engagement_score: f64,
}

/// One user's summed activity for a ranking window, pre-rank.
#[derive(Debug, Clone)]
pub struct RankingRow {
    pub user_id: String,
    pub user_name: String,
    pub message_count: i64,
    pub reaction_count: i64,
    pub thread_count: i64,
    pub score: f64,
}

fn map_metric_row(row: &Row) -> rusqlite::Result<DbEngagementMetric> {
    Ok(DbEngagementMetric {
        channel_id: row.get(0)?,
        date: row.get(1)?,
        message_count: row.get(2)?,
        user_count: row.get(3)?,
        reaction_count: row.get(4)?,
        thread_count: row.get(5)?,
        avg_message_length: row.get(6)?,
        engagement_score: row.get(7)?,
    })
}

impl MetricsDb {
    /// Delete a channel's rollup rows for an inclusive date range. Called
    /// inside the recompute transaction so readers never see a half-replaced
    /// window.
    pub fn delete_rollups_in_window(
        &self,
        channel_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<(), DbError> {
        self.conn_ref().execute(
            "DELETE FROM engagement_metrics
             WHERE channel_id = ?1 AND date >= ?2 AND date <= ?3",
            params![channel_id, start_date, end_date],
        )?;
        self.conn_ref().execute(
            "DELETE FROM user_activity
             WHERE channel_id = ?1 AND date >= ?2 AND date <= ?3",
            params![channel_id, start_date, end_date],
        )?;
        Ok(())
    }

    pub fn upsert_engagement_metric(&self, metric: &DbEngagementMetric) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT INTO engagement_metrics
                (channel_id, date, message_count, user_count, reaction_count,
                 thread_count, avg_message_length, engagement_score)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(channel_id, date) DO UPDATE SET
                message_count = excluded.message_count,
                user_count = excluded.user_count,
                reaction_count = excluded.reaction_count,
                thread_count = excluded.thread_count,
                avg_message_length = excluded.avg_message_length,
                engagement_score = excluded.engagement_score",
            params![
                metric.channel_id,
                metric.date,
                metric.message_count,
                metric.user_count,
                metric.reaction_count,
                metric.thread_count,
                metric.avg_message_length,
                metric.engagement_score,
            ],
        )?;
        Ok(())
    }

    pub fn upsert_user_activity(&self, activity: &DbUserActivity) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT INTO user_activity
                (user_id, channel_id, date, message_count, reaction_count,
                 thread_count, avg_message_length)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id, channel_id, date) DO UPDATE SET
                message_count = excluded.message_count,
                reaction_count = excluded.reaction_count,
                thread_count = excluded.thread_count,
                avg_message_length = excluded.avg_message_length",
            params![
                activity.user_id,
                activity.channel_id,
                activity.date,
                activity.message_count,
                activity.reaction_count,
                activity.thread_count,
                activity.avg_message_length,
            ],
        )?;
        Ok(())
    }

    /// Stored metric rows, optionally filtered by channel and date range,
    /// newest first.
    pub fn get_engagement_metrics(
        &self,
        channel_id: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<DbEngagementMetric>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT channel_id, date, message_count, user_count, reaction_count,
                    thread_count, avg_message_length, engagement_score
             FROM engagement_metrics
             WHERE (?1 IS NULL OR channel_id = ?1)
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
             ORDER BY date DESC, channel_id",
        )?;
        let rows = stmt.query_map(params![channel_id, start_date, end_date], map_metric_row)?;
        let mut metrics = Vec::new();
        for row in rows {
            metrics.push(row?);
        }
        Ok(metrics)
    }

    pub fn workspace_totals(&self, since_date: &str) -> Result<WorkspaceTotals, DbError> {
        let totals = self.conn_ref().query_row(
            "SELECT COUNT(DISTINCT channel_id),
                    COALESCE(SUM(message_count), 0),
                    COALESCE(SUM(reaction_count), 0),
                    COALESCE(AVG(engagement_score), 0)
             FROM engagement_metrics
             WHERE date >= ?1",
            params![since_date],
            |row| {
                Ok(WorkspaceTotals {
                    total_channels: row.get(0)?,
                    total_messages: row.get(1)?,
                    total_reactions: row.get(2)?,
                    avg_engagement_score: row.get(3)?,
                })
            },
        )?;
        Ok(totals)
    }

    /// Distinct users active anywhere in the window. Counted once across the
    /// whole of `user_activity`, never summed per channel; a user active in
    /// five channels is one user.
    pub fn distinct_active_users(&self, since_date: &str) -> Result<i64, DbError> {
        let count = self.conn_ref().query_row(
            "SELECT COUNT(DISTINCT ua.user_id)
             FROM user_activity ua
             LEFT JOIN users u ON u.id = ua.user_id
             WHERE ua.date >= ?1
               AND COALESCE(u.is_bot, 0) = 0
               AND COALESCE(u.deleted, 0) = 0",
            params![since_date],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn most_active_channel(
        &self,
        since_date: &str,
    ) -> Result<Option<(String, Option<String>, i64)>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT em.channel_id, c.name, SUM(em.message_count) AS messages
             FROM engagement_metrics em
             LEFT JOIN channels c ON c.id = em.channel_id
             WHERE em.date >= ?1
             GROUP BY em.channel_id
             ORDER BY messages DESC
             LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![since_date], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Workspace-level sums per day with a row for every day that has data.
    /// The service layer densifies against the full window. Per-day active
    /// users carry the same bot and deleted-user exclusions as
    /// `distinct_active_users`, so the series agrees with the window total.
    pub fn daily_activity_sums(&self, since_date: &str) -> Result<Vec<DailySums>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT em.date,
                    SUM(em.message_count),
                    COALESCE(au.active_users, 0),
                    SUM(em.reaction_count),
                    SUM(em.thread_count)
             FROM engagement_metrics em
             LEFT JOIN (
                 SELECT ua.date, COUNT(DISTINCT ua.user_id) AS active_users
                 FROM user_activity ua
                 LEFT JOIN users u ON u.id = ua.user_id
                 WHERE ua.date >= ?1
                   AND COALESCE(u.is_bot, 0) = 0
                   AND COALESCE(u.deleted, 0) = 0
                 GROUP BY ua.date
             ) au ON au.date = em.date
             WHERE em.date >= ?1
             GROUP BY em.date
             ORDER BY em.date",
        )?;
        let rows = stmt.query_map(params![since_date], |row| {
            Ok(DailySums {
                date: row.get(0)?,
                message_count: row.get(1)?,
                active_users: row.get(2)?,
                reaction_count: row.get(3)?,
                thread_count: row.get(4)?,
            })
        })?;
        let mut sums = Vec::new();
        for row in rows {
            sums.push(row?);
        }
        Ok(sums)
    }

    /// Per-channel window sums, sorted by average daily score descending.
    pub fn channel_breakdown(&self, since_date: &str) -> Result<Vec<ChannelBreakdownRow>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT em.channel_id, c.name,
                    SUM(em.message_count),
                    COALESCE(uc.user_count, 0),
                    AVG(em.engagement_score) AS avg_score
             FROM engagement_metrics em
             LEFT JOIN channels c ON c.id = em.channel_id
             LEFT JOIN (
                 SELECT channel_id, COUNT(DISTINCT user_id) AS user_count
                 FROM user_activity
                 WHERE date >= ?1
                 GROUP BY channel_id
             ) uc ON uc.channel_id = em.channel_id
             WHERE em.date >= ?1
             GROUP BY em.channel_id
             ORDER BY avg_score DESC",
        )?;
        let rows = stmt.query_map(params![since_date], |row| {
            Ok(ChannelBreakdownRow {
                channel_id: row.get(0)?,
                channel_name: row.get(1)?,
                message_count: row.get(2)?,
                user_count: row.get(3)?,
                avg_engagement_score: row.get(4)?,
            })
        })?;
        let mut breakdown = Vec::new();
        for row in rows {
            breakdown.push(row?);
        }
        Ok(breakdown)
    }

    /// Summed per-user activity for a ranking window, bot and deleted users
    /// excluded, ordered score desc then user_id asc so ties are
    /// deterministic across runs.
    pub fn user_ranking_rows(
        &self,
        since_date: &str,
        channel_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RankingRow>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT ua.user_id,
                    COALESCE(u.display_name, u.real_name, u.name, ua.user_id),
                    SUM(ua.message_count),
                    SUM(ua.reaction_count),
                    SUM(ua.thread_count),
                    (SUM(ua.message_count) + SUM(ua.reaction_count) * 2.0) AS score
             FROM user_activity ua
             LEFT JOIN users u ON u.id = ua.user_id
             WHERE ua.date >= ?1
               AND (?2 IS NULL OR ua.channel_id = ?2)
               AND COALESCE(u.is_bot, 0) = 0
               AND COALESCE(u.deleted, 0) = 0
             GROUP BY ua.user_id
             ORDER BY score DESC, ua.user_id ASC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![since_date, channel_id, limit as i64], |row| {
            Ok(RankingRow {
                user_id: row.get(0)?,
                user_name: row.get(1)?,
                message_count: row.get(2)?,
                reaction_count: row.get(3)?,
                thread_count: row.get(4)?,
                score: row.get(5)?,
            })
        })?;
        let mut rankings = Vec::new();
        for row in rows {
            rankings.push(row?);
        }
        Ok(rankings)
    }

    /// Distinct active users per day across the window, for activation.
    pub fn active_users_by_day(&self, since_date: &str) -> Result<Vec<(String, i64)>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT ua.date, COUNT(DISTINCT ua.user_id)
             FROM user_activity ua
             LEFT JOIN users u ON u.id = ua.user_id
             WHERE ua.date >= ?1
               AND COALESCE(u.is_bot, 0) = 0
               AND COALESCE(u.deleted, 0) = 0
             GROUP BY ua.date
             ORDER BY ua.date",
        )?;
        let rows = stmt.query_map(params![since_date], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut days = Vec::new();
        for row in rows {
            days.push(row?);
        }
        Ok(days)
    }

    /// Users first stored per day. Approximated from `DATE(updated_at)`, which
    /// conflates profile updates with first sighting; good enough for the
    /// soft "new users" series.
    pub fn new_users_by_day(&self, since_date: &str) -> Result<Vec<(String, i64)>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT DATE(updated_at), COUNT(*)
             FROM users
             WHERE is_bot = 0 AND deleted = 0 AND DATE(updated_at) >= ?1
             GROUP BY DATE(updated_at)
             ORDER BY DATE(updated_at)",
        )?;
        let rows = stmt.query_map(params![since_date], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut days = Vec::new();
        for row in rows {
            days.push(row?);
        }
        Ok(days)
    }

    /// Distinct users active in one channel's window. A user active on
    /// several days counts once, never once per day.
    pub fn channel_distinct_users(
        &self,
        channel_id: &str,
        since_date: &str,
    ) -> Result<i64, DbError> {
        let count = self.conn_ref().query_row(
            "SELECT COUNT(DISTINCT user_id) FROM user_activity
             WHERE channel_id = ?1 AND date >= ?2",
            params![channel_id, since_date],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// The channel's busiest day in the window, if any day has data.
    pub fn channel_most_active_day(
        &self,
        channel_id: &str,
        since_date: &str,
    ) -> Result<Option<String>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT date FROM engagement_metrics
             WHERE channel_id = ?1 AND date >= ?2
             ORDER BY message_count DESC, date DESC
             LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![channel_id, since_date], |row| row.get(0))?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }
}
