//! Engagement aggregation engine and read-side queries.
//!
//! The recompute path turns raw messages into per-day rollups for one channel
//! and window, atomically. The read path serves workspace overview,
//! activation, rankings, top posts, and per-channel summaries from the rollup
//! tables.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::dates::DateWindow;
use crate::db::messages::TopPostRow;
use crate::db::rollups::ChannelBreakdownRow;
use crate::db::{DbEngagementMetric, DbError, DbUserActivity, MetricsDb};
use crate::trend::{self, ThresholdPolicy, Trend};

const MESSAGE_WEIGHT: f64 = 1.0;
const REACTION_WEIGHT: f64 = 2.0;
const THREAD_WEIGHT: f64 = 1.5;
const USER_WEIGHT: f64 = 0.5;

/// Relative band for channel-activity trends.
const ACTIVITY_TREND_BAND: f64 = 0.1;
/// Absolute band, in percentage points, for activation-rate trends. A
/// relative band around a near-zero prior rate would flap on noise.
const ACTIVATION_TREND_POINTS: f64 = 2.0;
/// Days per half-window when trending recent channel engagement.
const TREND_HALF_DAYS: i64 = 3;

/// Weighted per-day score, normalized by participants.
///
/// The divisor floors at 1 so days where no message has an attributable
/// author still score rather than divide by zero.
pub fn engagement_score(messages: i64, users: i64, reactions: i64, threads: i64) -> f64 {
    let weighted = messages as f64 * MESSAGE_WEIGHT
        + reactions as f64 * REACTION_WEIGHT
        + threads as f64 * THREAD_WEIGHT
        + users as f64 * USER_WEIGHT;
    weighted / users.max(1) as f64
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Recompute one channel's rollups for a window.
///
/// Runs in a single transaction: the window's rows are deleted and rebuilt
/// from `messages`, so a reader sees either the pre-sync window or the fully
/// recomputed one. Days with zero messages get no row. Returns the number of
/// days written.
pub fn recompute_channel_metrics(
    db: &MetricsDb,
    channel_id: &str,
    window: &DateWindow,
) -> Result<usize, DbError> {
    let days_written = db.with_transaction(|db| {
        db.delete_rollups_in_window(channel_id, &window.start_iso(), &window.end_iso())?;

        let mut days_written = 0;
        for day in window.iter() {
            let date = day.format("%Y-%m-%d").to_string();
            let stats = db.daily_channel_stats(channel_id, &date)?;
            if stats.message_count == 0 {
                continue;
            }

            db.upsert_engagement_metric(&DbEngagementMetric {
                channel_id: channel_id.to_string(),
                date: date.clone(),
                message_count: stats.message_count,
                user_count: stats.user_count,
                reaction_count: stats.reaction_count,
                thread_count: stats.thread_count,
                avg_message_length: stats.avg_message_length,
                engagement_score: engagement_score(
                    stats.message_count,
                    stats.user_count,
                    stats.reaction_count,
                    stats.thread_count,
                ),
            })?;

            for user in db.user_daily_stats(channel_id, &date)? {
                db.upsert_user_activity(&DbUserActivity {
                    user_id: user.user_id,
                    channel_id: channel_id.to_string(),
                    date: date.clone(),
                    message_count: user.message_count,
                    reaction_count: user.reaction_count,
                    thread_count: user.thread_count,
                    avg_message_length: user.avg_message_length,
                })?;
            }

            days_written += 1;
        }
        Ok(days_written)
    })?;

    log::info!(
        "Recomputed {} for {}..{}: {} active day(s)",
        channel_id,
        window.start_iso(),
        window.end_iso(),
        days_written
    );
    Ok(days_written)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MostActiveChannel {
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub message_count: i64,
}

/// One day of workspace-level activity. The score here is recomputed from
/// workspace sums with the same weights as the per-channel score.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    pub date: String,
    pub message_count: i64,
    pub active_users: i64,
    pub reaction_count: i64,
    pub engagement_score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceOverview {
    pub total_channels: i64,
    pub total_messages: i64,
    pub total_reactions: i64,
    /// Distinct across the whole window, never a per-channel sum.
    pub total_users: i64,
    pub avg_engagement_score: f64,
    pub most_active_channel: Option<MostActiveChannel>,
    pub daily_activity: Vec<DailyActivity>,
    pub channel_breakdown: Vec<ChannelBreakdownRow>,
}

pub fn get_workspace_overview(db: &MetricsDb, days: i64) -> Result<WorkspaceOverview, DbError> {
    let window = DateWindow::trailing_days(days);
    let since = window.start_iso();

    let totals = db.workspace_totals(&since)?;
    let total_users = db.distinct_active_users(&since)?;
    let most_active_channel =
        db.most_active_channel(&since)?
            .map(|(channel_id, channel_name, message_count)| MostActiveChannel {
                channel_id,
                channel_name,
                message_count,
            });

    let by_date: HashMap<String, _> = db
        .daily_activity_sums(&since)?
        .into_iter()
        .map(|sums| (sums.date.clone(), sums))
        .collect();

    // Dense series: every calendar day in the window, zeros where the sparse
    // rollups have no row.
    let daily_activity = window
        .iter()
        .map(|day| {
            let date = day.format("%Y-%m-%d").to_string();
            match by_date.get(&date) {
                Some(sums) => DailyActivity {
                    date,
                    message_count: sums.message_count,
                    active_users: sums.active_users,
                    reaction_count: sums.reaction_count,
                    engagement_score: engagement_score(
                        sums.message_count,
                        sums.active_users,
                        sums.reaction_count,
                        sums.thread_count,
                    ),
                },
                None => DailyActivity {
                    date,
                    message_count: 0,
                    active_users: 0,
                    reaction_count: 0,
                    engagement_score: 0.0,
                },
            }
        })
        .collect();

    Ok(WorkspaceOverview {
        total_channels: totals.total_channels,
        total_messages: totals.total_messages,
        total_reactions: totals.total_reactions,
        total_users,
        avg_engagement_score: totals.avg_engagement_score,
        most_active_channel,
        daily_activity,
        channel_breakdown: db.channel_breakdown(&since)?,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivation {
    pub date: String,
    /// The workspace user base, repeated per row so each row is
    /// self-contained for charting.
    pub total_users: i64,
    pub active_users: i64,
    pub new_users: i64,
    pub activation_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationMetrics {
    /// All non-bot, non-deleted users known to the store; not windowed.
    pub total_workspace_users: i64,
    pub active_users: i64,
    pub activation_rate: f64,
    pub daily_activation: Vec<DailyActivation>,
    pub activation_trend: Trend,
}

pub fn get_user_activation_metrics(db: &MetricsDb, days: i64) -> Result<ActivationMetrics, DbError> {
    let window = DateWindow::trailing_days(days);
    let since = window.start_iso();

    let total_workspace_users = db.active_user_base()?;
    let active_users = db.distinct_active_users(&since)?;
    let activation_rate = if total_workspace_users > 0 {
        active_users as f64 / total_workspace_users as f64 * 100.0
    } else {
        0.0
    };

    let active_by_day: HashMap<String, i64> = db.active_users_by_day(&since)?.into_iter().collect();
    let new_by_day: HashMap<String, i64> = db.new_users_by_day(&since)?.into_iter().collect();

    let daily_activation: Vec<DailyActivation> = window
        .iter()
        .map(|day| {
            let date = day.format("%Y-%m-%d").to_string();
            let active = active_by_day.get(&date).copied().unwrap_or(0);
            DailyActivation {
                activation_rate: if total_workspace_users > 0 {
                    active as f64 / total_workspace_users as f64 * 100.0
                } else {
                    0.0
                },
                total_users: total_workspace_users,
                active_users: active,
                new_users: new_by_day.get(&date).copied().unwrap_or(0),
                date,
            }
        })
        .collect();

    let series: Vec<f64> = daily_activation.iter().map(|d| d.activation_rate).collect();
    let activation_trend =
        trend::classify_series(&series, ThresholdPolicy::Absolute(ACTIVATION_TREND_POINTS));

    Ok(ActivationMetrics {
        total_workspace_users,
        active_users,
        activation_rate,
        daily_activation,
        activation_trend,
    })
}

#[derive(Debug, Clone)]
pub struct RankingQuery {
    pub days: i64,
    pub channel_id: Option<String>,
    pub limit: usize,
}

impl Default for RankingQuery {
    fn default() -> Self {
        Self {
            days: 30,
            channel_id: None,
            limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRanking {
    pub rank: usize,
    pub user_id: String,
    pub user_name: String,
    pub message_count: i64,
    pub reaction_count: i64,
    pub thread_count: i64,
    pub score: f64,
}

/// Ranked users for a window. Rank is the 1-based position in the ordered
/// list; ties share a score but not a rank, and the score-desc/user-id-asc
/// ordering makes the assignment deterministic.
pub fn get_user_rankings(db: &MetricsDb, query: &RankingQuery) -> Result<Vec<UserRanking>, DbError> {
    let since = DateWindow::trailing_days(query.days).start_iso();
    let rows = db.user_ranking_rows(&since, query.channel_id.as_deref(), query.limit)?;

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| UserRanking {
            rank: index + 1,
            user_id: row.user_id,
            user_name: row.user_name,
            message_count: row.message_count,
            reaction_count: row.reaction_count,
            thread_count: row.thread_count,
            score: row.score,
        })
        .collect())
}

pub fn get_top_posts(db: &MetricsDb, days: i64, limit: usize) -> Result<Vec<TopPostRow>, DbError> {
    let since = DateWindow::trailing_days(days).start_iso();
    db.top_posts(&since, limit)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelActivity {
    pub channel_id: String,
    pub message_count: i64,
    pub user_count: i64,
    pub reaction_count: i64,
    pub most_active_day: Option<String>,
    pub trend: Trend,
}

/// Window totals for one channel plus a short-horizon engagement trend:
/// the average stored daily score over the last three days against the
/// three before. Only scored days carry weight, and a half with no scored
/// days reads as stable.
pub fn get_channel_activity(
    db: &MetricsDb,
    channel_id: &str,
    days: i64,
) -> Result<ChannelActivity, DbError> {
    let window = DateWindow::trailing_days(days);
    let since = window.start_iso();

    let metrics = db.get_engagement_metrics(Some(channel_id), Some(since.as_str()), None)?;
    let message_count = metrics.iter().map(|m| m.message_count).sum();
    let reaction_count = metrics.iter().map(|m| m.reaction_count).sum();
    let user_count = db.channel_distinct_users(channel_id, &since)?;
    let most_active_day = db.channel_most_active_day(channel_id, &since)?;

    let today = Utc::now().date_naive();
    let recent_cutoff = (today - Duration::days(TREND_HALF_DAYS))
        .format("%Y-%m-%d")
        .to_string();
    let prior_cutoff = (today - Duration::days(TREND_HALF_DAYS * 2))
        .format("%Y-%m-%d")
        .to_string();
    let trend_rows = db.get_engagement_metrics(Some(channel_id), Some(prior_cutoff.as_str()), None)?;
    let (mut prior, mut recent) = (Vec::new(), Vec::new());
    for row in &trend_rows {
        if row.date.as_str() >= recent_cutoff.as_str() {
            recent.push(row.engagement_score);
        } else {
            prior.push(row.engagement_score);
        }
    }
    let trend = if prior.is_empty() || recent.is_empty() {
        Trend::Stable
    } else {
        trend::classify_windows(
            mean(&prior),
            mean(&recent),
            ThresholdPolicy::RelativeToPrior(ACTIVITY_TREND_BAND),
        )
    };

    Ok(ChannelActivity {
        channel_id: channel_id.to_string(),
        message_count,
        user_count,
        reaction_count,
        most_active_day,
        trend,
    })
}

/// Filters for the stored-metrics query. All fields optional.
#[derive(Debug, Clone, Default)]
pub struct MetricsQuery {
    pub channel_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub fn get_engagement_metrics(
    db: &MetricsDb,
    query: &MetricsQuery,
) -> Result<Vec<DbEngagementMetric>, DbError> {
    db.get_engagement_metrics(
        query.channel_id.as_deref(),
        query.start_date.as_deref(),
        query.end_date.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{noon_ts, test_db};
    use crate::db::{DbMessage, DbUser};
    use chrono::{Duration, NaiveDate, Utc};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
    }

    fn days_ago(n: i64) -> String {
        (Utc::now().date_naive() - Duration::days(n))
            .format("%Y-%m-%d")
            .to_string()
    }

    fn message(ts: &str, channel: &str, user: Option<&str>, text: &str) -> DbMessage {
        DbMessage {
            ts: ts.to_string(),
            channel_id: channel.to_string(),
            user_id: user.map(|u| u.to_string()),
            text: Some(text.to_string()),
            thread_ts: None,
            reply_count: 0,
            reaction_count: 0,
        }
    }

    fn plain_user(id: &str) -> DbUser {
        DbUser {
            id: id.to_string(),
            name: Some(id.to_lowercase()),
            real_name: None,
            display_name: None,
            is_bot: false,
            deleted: false,
        }
    }

    #[test]
    fn test_engagement_score_formula_and_floor() {
        // (2 + 2*2 + 1*1.5 + 2*0.5) / 2 = 4.25
        assert_eq!(engagement_score(2, 2, 2, 1), 4.25);
        // Five authorless messages: divisor floors at 1
        assert_eq!(engagement_score(5, 0, 0, 0), 5.0);
    }

    #[test]
    fn test_recompute_channel_scenario() {
        let db = test_db();

        let mut m1 = message(&noon_ts("2024-01-05", 1), "C1", Some("U1"), "first");
        m1.reaction_count = 2;
        let mut m2 = message(&noon_ts("2024-01-05", 2), "C1", Some("U2"), "second");
        m2.thread_ts = Some(m1.ts.clone());
        db.upsert_message(&m1, &[]).expect("m1");
        db.upsert_message(&m2, &[]).expect("m2");

        let window = DateWindow::new(d("2024-01-01"), d("2024-01-10"));
        let days = recompute_channel_metrics(&db, "C1", &window).expect("recompute");
        assert_eq!(days, 1, "only one day had messages");

        let metrics = db
            .get_engagement_metrics(Some("C1"), None, None)
            .expect("metrics");
        assert_eq!(metrics.len(), 1);
        let row = &metrics[0];
        assert_eq!(row.date, "2024-01-05");
        assert_eq!(row.message_count, 2);
        assert_eq!(row.user_count, 2);
        assert_eq!(row.reaction_count, 2);
        assert_eq!(row.thread_count, 1);
        assert_eq!(row.engagement_score, 4.25);

        let activity: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM user_activity", [], |r| r.get(0))
            .expect("count");
        assert_eq!(activity, 2);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let db = test_db();

        let mut m = message(&noon_ts("2024-01-05", 1), "C1", Some("U1"), "hello");
        m.reaction_count = 1;
        db.upsert_message(&m, &[]).expect("insert");

        let window = DateWindow::new(d("2024-01-01"), d("2024-01-10"));
        recompute_channel_metrics(&db, "C1", &window).expect("first");
        let first = db
            .get_engagement_metrics(Some("C1"), None, None)
            .expect("query");

        recompute_channel_metrics(&db, "C1", &window).expect("second");
        let second = db
            .get_engagement_metrics(Some("C1"), None, None)
            .expect("query");

        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].engagement_score, second[0].engagement_score);
        assert_eq!(first[0].message_count, second[0].message_count);
    }

    #[test]
    fn test_recompute_clears_stale_rows() {
        let db = test_db();

        // A stale rollup row for a day that (no longer) has messages
        db.upsert_engagement_metric(&DbEngagementMetric {
            channel_id: "C1".to_string(),
            date: "2024-01-06".to_string(),
            message_count: 99,
            user_count: 9,
            reaction_count: 0,
            thread_count: 0,
            avg_message_length: 0.0,
            engagement_score: 99.0,
        })
        .expect("stale row");

        db.upsert_message(
            &message(&noon_ts("2024-01-05", 1), "C1", Some("U1"), "hello"),
            &[],
        )
        .expect("message");

        let window = DateWindow::new(d("2024-01-01"), d("2024-01-10"));
        recompute_channel_metrics(&db, "C1", &window).expect("recompute");

        let metrics = db
            .get_engagement_metrics(Some("C1"), None, None)
            .expect("query");
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].date, "2024-01-05");
    }

    #[test]
    fn test_recompute_ignores_other_channels() {
        let db = test_db();

        db.upsert_message(
            &message(&noon_ts("2024-01-05", 1), "C1", Some("U1"), "here"),
            &[],
        )
        .expect("insert");
        db.upsert_message(
            &message(&noon_ts("2024-01-05", 2), "C2", Some("U1"), "elsewhere"),
            &[],
        )
        .expect("insert");

        let window = DateWindow::new(d("2024-01-01"), d("2024-01-10"));
        recompute_channel_metrics(&db, "C1", &window).expect("recompute");

        let metrics = db.get_engagement_metrics(None, None, None).expect("query");
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].channel_id, "C1");
    }

    #[test]
    fn test_workspace_overview_dedups_users_and_densifies() {
        let db = test_db();
        db.upsert_user(&plain_user("U1")).expect("user");

        // Same user active in two channels on a recent day
        let day = days_ago(2);
        for (seq, channel) in [(1, "C1"), (2, "C2")] {
            let msg = message(&noon_ts(&day, seq), channel, Some("U1"), "hi");
            db.upsert_message(&msg, &[]).expect("insert");
        }
        let window = DateWindow::trailing_days(7);
        recompute_channel_metrics(&db, "C1", &window).expect("recompute C1");
        recompute_channel_metrics(&db, "C2", &window).expect("recompute C2");

        let overview = get_workspace_overview(&db, 7).expect("overview");
        assert_eq!(overview.total_channels, 2);
        assert_eq!(overview.total_messages, 2);
        assert_eq!(overview.total_users, 1, "one user, not one per channel");
        assert_eq!(overview.daily_activity.len(), 7, "dense series");

        let active_day = overview
            .daily_activity
            .iter()
            .find(|d| d.date == day)
            .expect("day present");
        assert_eq!(active_day.message_count, 2);
        assert_eq!(active_day.active_users, 1);

        let quiet_days = overview
            .daily_activity
            .iter()
            .filter(|d| d.message_count == 0)
            .count();
        assert_eq!(quiet_days, 6);
    }

    #[test]
    fn test_empty_overview_is_distinguishable_from_failure() {
        let db = test_db();
        let overview = get_workspace_overview(&db, 7).expect("empty store still answers");
        assert_eq!(overview.total_messages, 0);
        assert!(overview.most_active_channel.is_none());
        assert_eq!(overview.daily_activity.len(), 7);
    }

    #[test]
    fn test_rankings_assign_positional_ranks() {
        let db = test_db();
        for id in ["U1", "U2", "U3"] {
            db.upsert_user(&plain_user(id)).expect("user");
        }

        let day = days_ago(1);
        // U2 loudest, then U1 and U3 tied (same score, id breaks the tie)
        for seq in 0..5 {
            db.upsert_message(
                &message(&noon_ts(&day, 100 + seq), "C1", Some("U2"), "msg"),
                &[],
            )
            .expect("insert");
        }
        for (seq, user) in [(1, "U1"), (2, "U3")] {
            db.upsert_message(&message(&noon_ts(&day, seq), "C1", Some(user), "msg"), &[])
                .expect("insert");
        }
        recompute_channel_metrics(&db, "C1", &DateWindow::trailing_days(7)).expect("recompute");

        let rankings = get_user_rankings(&db, &RankingQuery::default()).expect("rankings");
        assert_eq!(rankings.len(), 3);
        assert_eq!(rankings[0].rank, 1);
        assert_eq!(rankings[0].user_id, "U2");
        assert_eq!(rankings[1].rank, 2);
        assert_eq!(rankings[1].user_id, "U1");
        assert_eq!(rankings[2].rank, 3);
        assert_eq!(rankings[2].user_id, "U3");
    }

    #[test]
    fn test_activation_metrics_counts_and_series() {
        let db = test_db();
        db.upsert_user(&plain_user("U1")).expect("user");
        db.upsert_user(&plain_user("U2")).expect("user");
        db.upsert_user(&plain_user("U3")).expect("user");
        db.upsert_user(&plain_user("U4")).expect("user");

        let day = days_ago(1);
        db.upsert_message(&message(&noon_ts(&day, 1), "C1", Some("U1"), "hi"), &[])
            .expect("insert");
        recompute_channel_metrics(&db, "C1", &DateWindow::trailing_days(7)).expect("recompute");

        let activation = get_user_activation_metrics(&db, 7).expect("activation");
        assert_eq!(activation.total_workspace_users, 4);
        assert_eq!(activation.active_users, 1);
        assert_eq!(activation.activation_rate, 25.0);
        assert_eq!(activation.daily_activation.len(), 7, "dense, zeros included");

        let active_day = activation
            .daily_activation
            .iter()
            .find(|d| d.date == day)
            .expect("day present");
        assert_eq!(active_day.total_users, 4);
        assert_eq!(active_day.active_users, 1);
        assert_eq!(active_day.activation_rate, 25.0);
    }

    #[test]
    fn test_activation_rate_zero_when_no_users() {
        let db = test_db();
        let activation = get_user_activation_metrics(&db, 7).expect("activation");
        assert_eq!(activation.total_workspace_users, 0);
        assert_eq!(activation.activation_rate, 0.0);
        assert_eq!(activation.activation_trend, Trend::Stable);
    }

    #[test]
    fn test_channel_activity_trend_up() {
        let db = test_db();

        // 10 msgs/day three days ago and before, 20/day since
        for offset in 0..6 {
            let day = days_ago(offset);
            let count = if offset < 3 { 20 } else { 10 };
            for seq in 0..count {
                db.upsert_message(
                    &message(&noon_ts(&day, seq), "C1", Some("U1"), "msg"),
                    &[],
                )
                .expect("insert");
            }
        }
        recompute_channel_metrics(&db, "C1", &DateWindow::trailing_days(10)).expect("recompute");

        let activity = get_channel_activity(&db, "C1", 30).expect("activity");
        assert_eq!(activity.message_count, 90);
        assert_eq!(activity.trend, Trend::Up);
        assert!(activity.most_active_day.is_some());
    }

    #[test]
    fn test_channel_activity_trend_follows_score_not_volume() {
        let db = test_db();

        // Older half: fewer messages but heavily reacted (daily score 42.5).
        // Recent half: more messages, no reactions (daily score 4.5). Volume
        // rises while engagement falls.
        for offset in 0..6 {
            let day = days_ago(offset);
            if offset < 3 {
                for seq in 0..4 {
                    db.upsert_message(
                        &message(&noon_ts(&day, seq), "C1", Some("U1"), "msg"),
                        &[],
                    )
                    .expect("insert");
                }
            } else {
                for seq in 0..2 {
                    let mut m = message(&noon_ts(&day, seq), "C1", Some("U1"), "msg");
                    m.reaction_count = 10;
                    db.upsert_message(&m, &[]).expect("insert");
                }
            }
        }
        recompute_channel_metrics(&db, "C1", &DateWindow::trailing_days(10)).expect("recompute");

        let activity = get_channel_activity(&db, "C1", 30).expect("activity");
        assert_eq!(activity.trend, Trend::Down);
    }

    #[test]
    fn test_channel_activity_empty_channel() {
        let db = test_db();
        let activity = get_channel_activity(&db, "C-quiet", 30).expect("activity");
        assert_eq!(activity.message_count, 0);
        assert_eq!(activity.user_count, 0);
        assert!(activity.most_active_day.is_none());
        assert_eq!(activity.trend, Trend::Stable);
    }

    #[test]
    fn test_metrics_query_filters() {
        let db = test_db();

        db.upsert_message(
            &message(&noon_ts("2024-01-05", 1), "C1", Some("U1"), "a"),
            &[],
        )
        .expect("insert");
        db.upsert_message(
            &message(&noon_ts("2024-01-08", 2), "C1", Some("U1"), "b"),
            &[],
        )
        .expect("insert");
        recompute_channel_metrics(&db, "C1", &DateWindow::new(d("2024-01-01"), d("2024-01-10")))
            .expect("recompute");

        let all = get_engagement_metrics(&db, &MetricsQuery::default()).expect("all");
        assert_eq!(all.len(), 2);

        let filtered = get_engagement_metrics(
            &db,
            &MetricsQuery {
                channel_id: Some("C1".to_string()),
                start_date: Some("2024-01-06".to_string()),
                end_date: None,
            },
        )
        .expect("filtered");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].date, "2024-01-08");
    }
}
