//! Aggregate statistics over every stored pomodoro session.
//!
//! Durations are seconds. "Today" is the current UTC calendar day.
//!
//! `current_streak` counts distinct UTC dates with at least one session
//! started in the trailing seven days (measured from `now`, not from
//! midnight). It is not a run of consecutive days.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::session::{SessionStatus, SessionType};
use crate::storage::sessions::{self, Aggregate, SessionFilter};

const STREAK_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_sessions: i64,
    pub completed_sessions: i64,
    pub total_work_time: i64,
    pub total_break_time: i64,
    pub average_session_duration: f64,
    pub interruptions_count: i64,
    pub today_sessions: i64,
    pub today_work_time: i64,
    pub current_streak: i64,
}

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Compute statistics as of `now`. Run inside one transaction.
pub fn compute(conn: &Connection, now: DateTime<Utc>) -> rusqlite::Result<SessionStats> {
    let all = SessionFilter::default();
    let work = SessionFilter::default().with_types(&[SessionType::Work]);
    let breaks = SessionFilter::default()
        .with_types(&[SessionType::ShortBreak, SessionType::LongBreak]);
    let today = SessionFilter::default().started_since(start_of_day(now));

    let stats = SessionStats {
        total_sessions: sessions::aggregate(conn, Aggregate::Count, &all)?,
        completed_sessions: sessions::aggregate(
            conn,
            Aggregate::Count,
            &SessionFilter::default().with_status(SessionStatus::Completed),
        )?,
        total_work_time: sessions::aggregate(
            conn,
            Aggregate::SumActualDuration,
            &work.clone().with_duration(),
        )?,
        total_break_time: sessions::aggregate(
            conn,
            Aggregate::SumActualDuration,
            &breaks.with_duration(),
        )?,
        average_session_duration: sessions::average_duration(conn, &all.clone().with_duration())?,
        interruptions_count: sessions::aggregate(conn, Aggregate::SumInterruptions, &all)?,
        today_sessions: sessions::aggregate(conn, Aggregate::Count, &today)?,
        today_work_time: sessions::aggregate(
            conn,
            Aggregate::SumActualDuration,
            &work.started_since(start_of_day(now)).with_duration(),
        )?,
        current_streak: sessions::aggregate(
            conn,
            Aggregate::DistinctStartDays,
            &SessionFilter::default().started_since(now - Duration::days(STREAK_WINDOW_DAYS)),
        )?,
    };

    tracing::debug!(
        total = stats.total_sessions,
        today = stats.today_sessions,
        "computed session stats"
    );
    Ok(stats)
}
