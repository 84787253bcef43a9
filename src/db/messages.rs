//! Message and reaction storage, plus the raw-table aggregate queries the
//! rollup engine reads.
//!
//! Messages use an overwrite upsert keyed by `ts`. Reactions are replaced
//! wholesale whenever their parent message re-syncs, so a reaction removed
//! upstream disappears here too.

use rusqlite::{params, Row};

use super::types::{DbError, DbMessage, DbReaction};
use super::MetricsDb;

/// Per-day aggregate over `messages` for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyChannelStats {
    pub message_count: i64,
    pub user_count: i64,
    pub reaction_count: i64,
    pub thread_count: i64,
    pub avg_message_length: f64,
}

/// Per-user, per-day aggregate over `messages` for one channel.
#[derive(Debug, Clone)]
pub struct UserDayStats {
    pub user_id: String,
    pub message_count: i64,
    pub reaction_count: i64,
    pub thread_count: i64,
    pub avg_message_length: f64,
}

/// A highly-engaged post, scored at read time.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPostRow {
    pub ts: String,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub text: String,
    pub reaction_count: i64,
    pub reply_count: i64,
    pub score: f64,
}

/// Calendar-day expression for a message `ts` column value.
const TS_DATE: &str = "DATE(CAST(ts AS INTEGER), 'unixepoch')";

fn map_message_row(row: &Row) -> rusqlite::Result<DbMessage> {
    Ok(DbMessage {
        ts: row.get(0)?,
        channel_id: row.get(1)?,
        user_id: row.get(2)?,
        text: row.get(3)?,
        thread_ts: row.get(4)?,
        reply_count: row.get(5)?,
        reaction_count: row.get(6)?,
    })
}

impl MetricsDb {
    /// Upsert a message and replace its reactions wholesale.
    pub fn upsert_message(
        &self,
        message: &DbMessage,
        reactions: &[DbReaction],
    ) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT INTO messages (ts, channel_id, user_id, text, thread_ts, reply_count, reaction_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(ts) DO UPDATE SET
                channel_id = excluded.channel_id,
                user_id = excluded.user_id,
                text = excluded.text,
                thread_ts = excluded.thread_ts,
                reply_count = excluded.reply_count,
                reaction_count = excluded.reaction_count",
            params![
                message.ts,
                message.channel_id,
                message.user_id,
                message.text,
                message.thread_ts,
                message.reply_count,
                message.reaction_count,
            ],
        )?;

        self.conn_ref().execute(
            "DELETE FROM reactions WHERE message_ts = ?1",
            params![message.ts],
        )?;
        for reaction in reactions {
            self.conn_ref().execute(
                "INSERT INTO reactions (message_ts, name, count, users) VALUES (?1, ?2, ?3, ?4)",
                params![message.ts, reaction.name, reaction.count, reaction.users],
            )?;
        }
        Ok(())
    }

    /// Batch message upsert with log-and-continue semantics.
    pub fn upsert_messages(
        &self,
        batch: &[(DbMessage, Vec<DbReaction>)],
    ) -> Result<usize, DbError> {
        let mut written = 0;
        for (message, reactions) in batch {
            match self.upsert_message(message, reactions) {
                Ok(()) => written += 1,
                Err(e) => log::warn!("Skipping message {}: {}", message.ts, e),
            }
        }
        Ok(written)
    }

    pub fn get_message(&self, ts: &str) -> Result<Option<DbMessage>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT ts, channel_id, user_id, text, thread_ts, reply_count, reaction_count
             FROM messages WHERE ts = ?1",
        )?;
        let mut rows = stmt.query_map(params![ts], map_message_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Aggregate one channel-day directly from `messages`.
    ///
    /// `user_count` counts distinct non-null authors, so a day of
    /// authorless messages aggregates with `user_count = 0`.
    pub fn daily_channel_stats(
        &self,
        channel_id: &str,
        date: &str,
    ) -> Result<DailyChannelStats, DbError> {
        let stats = self.conn_ref().query_row(
            &format!(
                "SELECT COUNT(*),
                        COUNT(DISTINCT user_id),
                        COALESCE(SUM(reaction_count), 0),
                        COUNT(CASE WHEN thread_ts IS NOT NULL THEN 1 END),
                        COALESCE(AVG(LENGTH(text)), 0)
                 FROM messages
                 WHERE channel_id = ?1 AND {TS_DATE} = ?2"
            ),
            params![channel_id, date],
            |row| {
                Ok(DailyChannelStats {
                    message_count: row.get(0)?,
                    user_count: row.get(1)?,
                    reaction_count: row.get(2)?,
                    thread_count: row.get(3)?,
                    avg_message_length: row.get(4)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Per-author aggregates for one channel-day. Authorless messages are
    /// excluded; they have no user to attribute activity to.
    pub fn user_daily_stats(
        &self,
        channel_id: &str,
        date: &str,
    ) -> Result<Vec<UserDayStats>, DbError> {
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT user_id,
                    COUNT(*),
                    COALESCE(SUM(reaction_count), 0),
                    COUNT(CASE WHEN thread_ts IS NOT NULL THEN 1 END),
                    COALESCE(AVG(LENGTH(text)), 0)
             FROM messages
             WHERE channel_id = ?1 AND user_id IS NOT NULL AND {TS_DATE} = ?2
             GROUP BY user_id"
        ))?;
        let rows = stmt.query_map(params![channel_id, date], |row| {
            Ok(UserDayStats {
                user_id: row.get(0)?,
                message_count: row.get(1)?,
                reaction_count: row.get(2)?,
                thread_count: row.get(3)?,
                avg_message_length: row.get(4)?,
            })
        })?;
        let mut stats = Vec::new();
        for row in rows {
            stats.push(row?);
        }
        Ok(stats)
    }

    /// Posts with the highest engagement since `since_date` (ISO date).
    ///
    /// score = reactions × 2 + replies × 1.5; ties break on raw reaction
    /// count. Bot-authored and empty-text posts are excluded.
    pub fn top_posts(&self, since_date: &str, limit: usize) -> Result<Vec<TopPostRow>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT m.ts, m.channel_id, c.name,
                    m.user_id,
                    COALESCE(u.display_name, u.real_name, u.name, m.user_id),
                    m.text, m.reaction_count, m.reply_count,
                    (m.reaction_count * 2.0 + m.reply_count * 1.5) AS score
             FROM messages m
             LEFT JOIN channels c ON c.id = m.channel_id
             LEFT JOIN users u ON u.id = m.user_id
             WHERE DATE(CAST(m.ts AS INTEGER), 'unixepoch') >= ?1
               AND m.text IS NOT NULL AND LENGTH(TRIM(m.text)) > 0
               AND (m.reaction_count > 0 OR m.reply_count > 0)
               AND COALESCE(u.is_bot, 0) = 0
             ORDER BY score DESC, m.reaction_count DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![since_date, limit as i64], |row| {
            Ok(TopPostRow {
                ts: row.get(0)?,
                channel_id: row.get(1)?,
                channel_name: row.get(2)?,
                user_id: row.get(3)?,
                user_name: row.get(4)?,
                text: row.get(5)?,
                reaction_count: row.get(6)?,
                reply_count: row.get(7)?,
                score: row.get(8)?,
            })
        })?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }
}
