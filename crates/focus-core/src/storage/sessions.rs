//! `pomodoro_sessions` table access.
//!
//! Filters build a shared `WHERE` clause so list, count and aggregate
//! queries always agree on which rows match.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{format_ts, parse_enum, parse_opt_ts, parse_ts, Pagination};
use crate::session::{NewSession, PomodoroSession, SessionStatus, SessionType};

const COLUMNS: &str = "id, session_type, status, planned_duration, actual_duration,
                       started_at, ended_at, task_id, session_number, notes, interruptions";

/// Row filter; every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub status: Option<SessionStatus>,
    pub task_id: Option<i64>,
    /// Empty means any type.
    pub session_types: Vec<SessionType>,
    pub started_since: Option<DateTime<Utc>>,
    /// Only rows whose `actual_duration` is set.
    pub has_duration: bool,
}

impl SessionFilter {
    pub fn with_status(mut self, status: SessionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_task(mut self, task_id: i64) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_types(mut self, types: &[SessionType]) -> Self {
        self.session_types = types.to_vec();
        self
    }

    pub fn started_since(mut self, since: DateTime<Utc>) -> Self {
        self.started_since = Some(since);
        self
    }

    pub fn with_duration(mut self) -> Self {
        self.has_duration = true;
        self
    }

    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(status) = self.status {
            conditions.push("status = ?".to_string());
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(task_id) = self.task_id {
            conditions.push("task_id = ?".to_string());
            values.push(Value::Integer(task_id));
        }
        if !self.session_types.is_empty() {
            let placeholders = vec!["?"; self.session_types.len()].join(", ");
            conditions.push(format!("session_type IN ({placeholders})"));
            values.extend(
                self.session_types
                    .iter()
                    .map(|t| Value::Text(t.as_str().to_string())),
            );
        }
        if let Some(since) = self.started_since {
            conditions.push("started_at >= ?".to_string());
            values.push(Value::Text(format_ts(since)));
        }
        if self.has_duration {
            conditions.push("actual_duration IS NOT NULL".to_string());
        }

        if conditions.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), values)
        }
    }
}

/// Scalar aggregates over matching rows. Empty sets yield 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    SumActualDuration,
    SumInterruptions,
    /// Distinct UTC dates on which a matching session started.
    DistinctStartDays,
}

impl Aggregate {
    fn expr(self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT(*)",
            Aggregate::SumActualDuration => "COALESCE(SUM(actual_duration), 0)",
            Aggregate::SumInterruptions => "COALESCE(SUM(interruptions), 0)",
            Aggregate::DistinctStartDays => "COUNT(DISTINCT substr(started_at, 1, 10))",
        }
    }
}

fn row_to_session(row: &Row) -> rusqlite::Result<PomodoroSession> {
    let session_type: String = row.get(1)?;
    let status: String = row.get(2)?;
    let started_at: String = row.get(5)?;

    Ok(PomodoroSession {
        id: row.get(0)?,
        session_type: parse_enum(1, &session_type)?,
        status: parse_enum(2, &status)?,
        planned_duration: row.get(3)?,
        actual_duration: row.get(4)?,
        started_at: parse_ts(5, &started_at)?,
        ended_at: parse_opt_ts(6, row.get(6)?)?,
        task_id: row.get(7)?,
        session_number: row.get(8)?,
        notes: row.get(9)?,
        interruptions: row.get(10)?,
    })
}

/// Insert an active session started at `started_at`; returns the stored row.
pub fn insert(
    conn: &Connection,
    new: &NewSession,
    started_at: DateTime<Utc>,
) -> rusqlite::Result<PomodoroSession> {
    conn.execute(
        "INSERT INTO pomodoro_sessions (
            session_type, status, planned_duration, actual_duration, started_at,
            ended_at, task_id, session_number, notes, interruptions
         ) VALUES (?1, ?2, ?3, NULL, ?4, NULL, ?5, ?6, ?7, 0)",
        params![
            new.session_type.as_str(),
            SessionStatus::Active.as_str(),
            new.planned_duration,
            format_ts(started_at),
            new.task_id,
            new.session_number,
            new.notes,
        ],
    )?;

    Ok(PomodoroSession {
        id: conn.last_insert_rowid(),
        session_type: new.session_type,
        status: SessionStatus::Active,
        planned_duration: new.planned_duration,
        actual_duration: None,
        started_at,
        ended_at: None,
        task_id: new.task_id,
        session_number: new.session_number,
        notes: new.notes.clone(),
        interruptions: 0,
    })
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<PomodoroSession>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM pomodoro_sessions WHERE id = ?1"),
        params![id],
        row_to_session,
    )
    .optional()
}

/// Matching rows, newest start first, plus the unpaged match count.
pub fn list(
    conn: &Connection,
    filter: &SessionFilter,
    page: Pagination,
) -> rusqlite::Result<(Vec<PomodoroSession>, u64)> {
    let (where_sql, mut values) = filter.where_clause();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM pomodoro_sessions{where_sql}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    values.push(Value::Integer(i64::from(page.limit)));
    values.push(Value::Integer(i64::try_from(page.skip).unwrap_or(i64::MAX)));
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM pomodoro_sessions{where_sql}
         ORDER BY started_at DESC, id DESC
         LIMIT ? OFFSET ?"
    ))?;
    let items = stmt
        .query_map(params_from_iter(values.iter()), row_to_session)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok((items, u64::try_from(total).unwrap_or(0)))
}

/// Every matching row, newest start first.
pub fn find_all(conn: &Connection, filter: &SessionFilter) -> rusqlite::Result<Vec<PomodoroSession>> {
    let (where_sql, values) = filter.where_clause();
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM pomodoro_sessions{where_sql} ORDER BY started_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), row_to_session)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Write back every mutable column of an existing row.
pub fn update(conn: &Connection, session: &PomodoroSession) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE pomodoro_sessions
         SET session_type = ?2, status = ?3, planned_duration = ?4, actual_duration = ?5,
             started_at = ?6, ended_at = ?7, task_id = ?8, session_number = ?9,
             notes = ?10, interruptions = ?11
         WHERE id = ?1",
        params![
            session.id,
            session.session_type.as_str(),
            session.status.as_str(),
            session.planned_duration,
            session.actual_duration,
            format_ts(session.started_at),
            session.ended_at.map(format_ts),
            session.task_id,
            session.session_number,
            session.notes,
            session.interruptions,
        ],
    )?;
    Ok(())
}

/// Returns whether a row was removed.
pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let removed = conn.execute("DELETE FROM pomodoro_sessions WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

pub fn aggregate(conn: &Connection, agg: Aggregate, filter: &SessionFilter) -> rusqlite::Result<i64> {
    let (where_sql, values) = filter.where_clause();
    conn.query_row(
        &format!("SELECT {} FROM pomodoro_sessions{where_sql}", agg.expr()),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )
}

/// Mean `actual_duration` over matching rows that have one; 0.0 if none.
pub fn average_duration(conn: &Connection, filter: &SessionFilter) -> rusqlite::Result<f64> {
    let (where_sql, values) = filter.where_clause();
    conn.query_row(
        &format!("SELECT COALESCE(AVG(actual_duration), 0.0) FROM pomodoro_sessions{where_sql}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn insert_and_get_round_trip() {
        let db = Database::open_memory().unwrap();
        let new = NewSession::new(SessionType::LongBreak, 900)
            .with_task(42)
            .with_session_number(4)
            .with_notes("stretch");
        let stored = insert(db.conn(), &new, t0()).unwrap();
        let fetched = get(db.conn(), stored.id).unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.task_id, Some(42));
        assert_eq!(fetched.status, SessionStatus::Active);
    }

    #[test]
    fn get_missing_returns_none() {
        let db = Database::open_memory().unwrap();
        assert!(get(db.conn(), 99).unwrap().is_none());
    }

    #[test]
    fn filters_combine_with_and() {
        let db = Database::open_memory().unwrap();
        let conn = db.conn();
        let a = insert(conn, &NewSession::new(SessionType::Work, 1500).with_task(1), t0()).unwrap();
        insert(conn, &NewSession::new(SessionType::Work, 1500).with_task(2), t0()).unwrap();
        let done = a.clone().finish(SessionStatus::Completed, t0() + Duration::minutes(25));
        update(conn, &done).unwrap();

        let filter = SessionFilter::default()
            .with_status(SessionStatus::Completed)
            .with_task(1);
        let (rows, total) = list(conn, &filter, Pagination::new(0, 10, 1000).unwrap()).unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, a.id);

        let filter = SessionFilter::default()
            .with_status(SessionStatus::Completed)
            .with_task(2);
        assert_eq!(aggregate(conn, Aggregate::Count, &filter).unwrap(), 0);
    }

    #[test]
    fn list_orders_newest_first() {
        let db = Database::open_memory().unwrap();
        let conn = db.conn();
        for minutes in [0, 30, 10] {
            insert(
                conn,
                &NewSession::new(SessionType::Work, 1500),
                t0() + Duration::minutes(minutes),
            )
            .unwrap();
        }
        let (rows, _) = list(conn, &SessionFilter::default(), Pagination::new(0, 10, 1000).unwrap())
            .unwrap();
        let starts: Vec<_> = rows.iter().map(|s| s.started_at).collect();
        assert_eq!(
            starts,
            vec![
                t0() + Duration::minutes(30),
                t0() + Duration::minutes(10),
                t0()
            ]
        );
    }

    #[test]
    fn aggregates_on_empty_table_are_zero() {
        let db = Database::open_memory().unwrap();
        let all = SessionFilter::default();
        for agg in [
            Aggregate::Count,
            Aggregate::SumActualDuration,
            Aggregate::SumInterruptions,
            Aggregate::DistinctStartDays,
        ] {
            assert_eq!(aggregate(db.conn(), agg, &all).unwrap(), 0);
        }
        assert_eq!(average_duration(db.conn(), &all).unwrap(), 0.0);
    }

    #[test]
    fn distinct_start_days_counts_dates() {
        let db = Database::open_memory().unwrap();
        let conn = db.conn();
        for hours in [0, 1, 24, 49] {
            insert(
                conn,
                &NewSession::new(SessionType::Work, 1500),
                t0() + Duration::hours(hours),
            )
            .unwrap();
        }
        assert_eq!(
            aggregate(conn, Aggregate::DistinctStartDays, &SessionFilter::default()).unwrap(),
            3
        );
    }

    #[test]
    fn delete_reports_removal() {
        let db = Database::open_memory().unwrap();
        let s = insert(db.conn(), &NewSession::new(SessionType::Work, 60), t0()).unwrap();
        assert!(delete(db.conn(), s.id).unwrap());
        assert!(!delete(db.conn(), s.id).unwrap());
    }
}
