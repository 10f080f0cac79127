//! Pomodoro session records and their state transitions.
//!
//! ## Lifecycle
//!
//! ```text
//! Active -> Completed
//!        -> Interrupted
//! ```
//!
//! A session is created `Active` and closed exactly once by the engine.
//! Closing stamps `ended_at` and derives `actual_duration` from `started_at`.
//! [`SessionPatch`] is the loose escape hatch: it writes fields directly and
//! does not check that they agree with each other.

pub mod engine;

pub use engine::SessionEngine;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::storage::storable;

/// Shortest session a caller may plan, in seconds.
pub const MIN_PLANNED_DURATION: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Work => "work",
            SessionType::ShortBreak => "short_break",
            SessionType::LongBreak => "long_break",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(SessionType::Work),
            "short_break" => Ok(SessionType::ShortBreak),
            "long_break" => Ok(SessionType::LongBreak),
            other => Err(ValidationError::invalid(
                "session_type",
                format!("unknown session type '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Interrupted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "interrupted" => Ok(SessionStatus::Interrupted),
            other => Err(ValidationError::invalid(
                "status",
                format!("unknown session status '{other}'"),
            )),
        }
    }
}

/// A stored pomodoro session.
///
/// `task_id` is a weak reference: the task may have been deleted since.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PomodoroSession {
    pub id: i64,
    pub session_type: SessionType,
    pub status: SessionStatus,
    /// Seconds.
    pub planned_duration: u32,
    /// Seconds, set when the session ends.
    pub actual_duration: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub task_id: Option<i64>,
    pub session_number: u32,
    pub notes: Option<String>,
    pub interruptions: u32,
}

impl PomodoroSession {
    /// Whole seconds between `started_at` and `now`, truncated.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds()
    }

    /// Seconds left of the planned interval, never negative.
    ///
    /// Display only: sessions do not expire on their own.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (i64::from(self.planned_duration) - self.elapsed_seconds(now)).max(0)
    }

    /// Close the session with the given terminal status.
    ///
    /// Re-closing an already closed session overwrites `ended_at` and
    /// `actual_duration` from the original `started_at`.
    pub fn finish(mut self, status: SessionStatus, now: DateTime<Utc>) -> Self {
        self.status = status;
        self.ended_at = Some(now);
        self.actual_duration = Some(self.elapsed_seconds(now));
        self
    }

    /// Close as interrupted and count the interruption.
    pub fn interrupt(self, now: DateTime<Utc>) -> Self {
        let mut session = self.finish(SessionStatus::Interrupted, now);
        session.interruptions = session.interruptions.saturating_add(1);
        session
    }

    /// Apply a partial update, producing the replacement record.
    pub fn apply_patch(self, patch: SessionPatch) -> Result<Self, ValidationError> {
        patch.validate()?;
        let SessionPatch {
            status,
            actual_duration,
            ended_at,
            notes,
            interruptions,
        } = patch;

        Ok(Self {
            status: status.unwrap_or(self.status),
            actual_duration: actual_duration.unwrap_or(self.actual_duration),
            ended_at: ended_at.map(|e| e.map(storable)).unwrap_or(self.ended_at),
            notes: notes.unwrap_or(self.notes),
            interruptions: interruptions.unwrap_or(self.interruptions),
            ..self
        })
    }
}

/// Request to open a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    pub session_type: SessionType,
    pub planned_duration: u32,
    #[serde(default)]
    pub task_id: Option<i64>,
    #[serde(default = "default_session_number")]
    pub session_number: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_session_number() -> u32 {
    1
}

impl NewSession {
    pub fn new(session_type: SessionType, planned_duration: u32) -> Self {
        Self {
            session_type,
            planned_duration,
            task_id: None,
            session_number: default_session_number(),
            notes: None,
        }
    }

    pub fn with_task(mut self, task_id: i64) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_session_number(mut self, session_number: u32) -> Self {
        self.session_number = session_number;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.planned_duration < MIN_PLANNED_DURATION {
            return Err(ValidationError::invalid(
                "planned_duration",
                format!(
                    "must be at least {MIN_PLANNED_DURATION} seconds, got {}",
                    self.planned_duration
                ),
            ));
        }
        if self.session_number == 0 {
            return Err(ValidationError::invalid("session_number", "must be at least 1"));
        }
        Ok(())
    }
}

/// Partial update for a session.
///
/// `None` leaves a field alone. For nullable fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub status: Option<SessionStatus>,
    pub actual_duration: Option<Option<i64>>,
    pub ended_at: Option<Option<DateTime<Utc>>>,
    pub notes: Option<Option<String>>,
    pub interruptions: Option<u32>,
}

impl SessionPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(Some(seconds)) = self.actual_duration {
            if seconds < 0 {
                return Err(ValidationError::invalid(
                    "actual_duration",
                    format!("must not be negative, got {seconds}"),
                ));
            }
        }
        Ok(())
    }
}
