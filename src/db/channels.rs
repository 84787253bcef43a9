//! Channel and user storage. Both use overwrite upserts keyed by the
//! upstream ID: the source of truth is upstream, last sync wins.

use rusqlite::{params, Row};

use super::types::{DbChannel, DbError, DbUser};
use super::MetricsDb;

fn map_channel_row(row: &Row) -> rusqlite::Result<DbChannel> {
    Ok(DbChannel {
        id: row.get(0)?,
        name: row.get(1)?,
        is_member: row.get::<_, i64>(2)? != 0,
        num_members: row.get(3)?,
        topic: row.get(4)?,
        purpose: row.get(5)?,
    })
}

fn map_user_row(row: &Row) -> rusqlite::Result<DbUser> {
    Ok(DbUser {
        id: row.get(0)?,
        name: row.get(1)?,
        real_name: row.get(2)?,
        display_name: row.get(3)?,
        is_bot: row.get::<_, i64>(4)? != 0,
        deleted: row.get::<_, i64>(5)? != 0,
    })
}

impl MetricsDb {
    pub fn upsert_channel(&self, channel: &DbChannel) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT INTO channels (id, name, is_member, num_members, topic, purpose, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                is_member = excluded.is_member,
                num_members = excluded.num_members,
                topic = excluded.topic,
                purpose = excluded.purpose,
                updated_at = excluded.updated_at",
            params![
                channel.id,
                channel.name,
                channel.is_member as i64,
                channel.num_members,
                channel.topic,
                channel.purpose,
            ],
        )?;
        Ok(())
    }

    pub fn get_channel(&self, id: &str) -> Result<Option<DbChannel>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, name, is_member, num_members, topic, purpose
             FROM channels WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], map_channel_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Channels the integration is a member of, the set a full sync walks.
    pub fn get_member_channels(&self) -> Result<Vec<DbChannel>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, name, is_member, num_members, topic, purpose
             FROM channels WHERE is_member = 1 ORDER BY name",
        )?;
        let rows = stmt.query_map([], map_channel_row)?;
        let mut channels = Vec::new();
        for row in rows {
            channels.push(row?);
        }
        Ok(channels)
    }

    pub fn upsert_user(&self, user: &DbUser) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT INTO users (id, name, real_name, display_name, is_bot, deleted, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                real_name = excluded.real_name,
                display_name = excluded.display_name,
                is_bot = excluded.is_bot,
                deleted = excluded.deleted,
                updated_at = excluded.updated_at",
            params![
                user.id,
                user.name,
                user.real_name,
                user.display_name,
                user.is_bot as i64,
                user.deleted as i64,
            ],
        )?;
        Ok(())
    }

    /// Batch user upsert. One malformed record never aborts the batch; failures
    /// are logged and skipped. Returns the number of rows written.
    pub fn upsert_users(&self, users: &[DbUser]) -> Result<usize, DbError> {
        let mut written = 0;
        for user in users {
            match self.upsert_user(user) {
                Ok(()) => written += 1,
                Err(e) => log::warn!("Skipping user {}: {}", user.id, e),
            }
        }
        Ok(written)
    }

    pub fn get_user(&self, id: &str) -> Result<Option<DbUser>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, name, real_name, display_name, is_bot, deleted
             FROM users WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], map_user_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Count of non-bot, non-deleted users. The activation denominator.
    pub fn active_user_base(&self) -> Result<i64, DbError> {
        let count = self.conn_ref().query_row(
            "SELECT COUNT(*) FROM users WHERE is_bot = 0 AND deleted = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
