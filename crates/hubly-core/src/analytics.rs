//! Analytics aggregator
//!
//! Read-only metrics over tickets created in the trailing ten weeks. Missed
//! status is judged with the detector predicate at aggregation time, not at
//! the end of the week a ticket falls in.
//!
//! Week buckets are aligned to UTC midnight. With `b(k)` the midnight of
//! `now - 7k days`, bucket "Week 1" (oldest) spans `[b(10), b(9))` and bucket
//! "Week 10" spans `[b(1), ..)`, so everything from the last seven days lands
//! in the newest bucket.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::missed;
use crate::ticket::Ticket;

/// Number of weekly buckets
pub const WEEKS: i64 = 10;
/// Days per bucket
pub const DAYS_PER_WEEK: i64 = 7;

/// One point of the missed-chat trend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekBucket {
    /// "Week 1" (oldest) through "Week 10"
    pub label: String,
    pub value: u64,
}

/// Dashboard metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_chats: u64,
    /// Oldest first
    pub missed_by_week: Vec<WeekBucket>,
    pub average_reply_time_seconds: i64,
    pub resolved_rate_percent: u32,
    pub resolved_count: u64,
}

/// Earliest creation time that counts toward the overview
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(WEEKS * DAYS_PER_WEEK)
}

fn midnight(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Bucket start boundaries, oldest first
fn week_starts(now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    (1..=WEEKS)
        .rev()
        .map(|k| midnight(now - Duration::days(DAYS_PER_WEEK * k)))
        .collect()
}

/// Compute the overview from tickets; tickets created before the window are
/// ignored
pub fn compute_overview(tickets: &[Ticket], threshold_seconds: u32, now: DateTime<Utc>) -> Overview {
    let start = window_start(now);
    let in_window: Vec<&Ticket> = tickets.iter().filter(|t| t.created_at >= start).collect();

    let starts = week_starts(now);
    let missed_by_week = starts
        .iter()
        .enumerate()
        .map(|(i, &from)| {
            let until = starts.get(i + 1).copied();
            let value = in_window
                .iter()
                .filter(|t| t.created_at >= from && until.map_or(true, |end| t.created_at < end))
                .filter(|t| missed::is_missed(t, threshold_seconds, now))
                .count() as u64;
            WeekBucket {
                label: format!("Week {}", i + 1),
                value,
            }
        })
        .collect();

    let reply_seconds: Vec<f64> = in_window
        .iter()
        .filter_map(|t| t.first_response_at.map(|at| at - t.created_at))
        .map(|d| d.num_milliseconds() as f64 / 1000.0)
        .collect();
    let average_reply_time_seconds = if reply_seconds.is_empty() {
        0
    } else {
        (reply_seconds.iter().sum::<f64>() / reply_seconds.len() as f64).round() as i64
    };

    let total_chats = in_window.len() as u64;
    let resolved_count = in_window.iter().filter(|t| t.status.is_resolved()).count() as u64;
    let resolved_rate_percent = if total_chats == 0 {
        0
    } else {
        ((resolved_count as f64 / total_chats as f64) * 100.0).round() as u32
    };

    Overview {
        total_chats,
        missed_by_week,
        average_reply_time_seconds,
        resolved_rate_percent,
        resolved_count,
    }
}
