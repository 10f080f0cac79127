//! Task records and their pomodoro bookkeeping.
//!
//! A task tracks how many pomodoros it was estimated to need and how many
//! were credited to it. `completed_at` is set exactly while the status is
//! `Completed`; every transition below keeps that pairing.

pub mod service;

pub use service::TaskService;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Longest allowed title, in characters.
pub const MAX_TITLE_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
    Archived,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "archived" => Ok(TaskStatus::Archived),
            other => Err(ValidationError::invalid(
                "status",
                format!("unknown task status '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            "urgent" => Ok(TaskPriority::Urgent),
            other => Err(ValidationError::invalid(
                "priority",
                format!("unknown priority '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub estimated_pomodoros: u32,
    pub completed_pomodoros: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Opaque to the core.
    pub tags: Option<String>,
    pub issue_url: Option<String>,
}

impl Task {
    /// Mark done, restamping `completed_at` even if it was already set.
    pub fn mark_completed(mut self, now: DateTime<Utc>) -> Self {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
        self
    }

    /// Credit one finished pomodoro.
    ///
    /// Reaching the estimate completes the task, but only on the increment
    /// that crosses it while the task is not already completed.
    pub fn record_pomodoro(mut self, now: DateTime<Utc>) -> Self {
        self.completed_pomodoros = self.completed_pomodoros.saturating_add(1);
        self.updated_at = now;
        if self.completed_pomodoros >= self.estimated_pomodoros
            && self.status != TaskStatus::Completed
        {
            self.status = TaskStatus::Completed;
            self.completed_at = Some(now);
        }
        self
    }

    /// Apply a partial update, producing the replacement record.
    pub fn apply_patch(self, patch: TaskPatch, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        patch.validate()?;
        let TaskPatch {
            title,
            description,
            status,
            priority,
            estimated_pomodoros,
            completed_pomodoros,
            tags,
            issue_url,
        } = patch;

        let completed_at = match status {
            Some(TaskStatus::Completed) => self.completed_at.or(Some(now)),
            Some(_) => None,
            None => self.completed_at,
        };

        Ok(Self {
            title: title.unwrap_or(self.title),
            description: description.unwrap_or(self.description),
            status: status.unwrap_or(self.status),
            priority: priority.unwrap_or(self.priority),
            estimated_pomodoros: estimated_pomodoros.unwrap_or(self.estimated_pomodoros),
            completed_pomodoros: completed_pomodoros.unwrap_or(self.completed_pomodoros),
            tags: tags.unwrap_or(self.tags),
            issue_url: issue_url.unwrap_or(self.issue_url),
            completed_at,
            updated_at: now,
            ..self
        })
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.chars().count();
    if len == 0 {
        return Err(ValidationError::invalid("title", "must not be empty"));
    }
    if len > MAX_TITLE_LEN {
        return Err(ValidationError::invalid(
            "title",
            format!("must be at most {MAX_TITLE_LEN} characters, got {len}"),
        ));
    }
    Ok(())
}

fn validate_estimate(estimated: u32) -> Result<(), ValidationError> {
    if estimated == 0 {
        return Err(ValidationError::invalid("estimated_pomodoros", "must be at least 1"));
    }
    Ok(())
}

/// Request to create a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default = "default_estimated_pomodoros")]
    pub estimated_pomodoros: u32,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub issue_url: Option<String>,
}

fn default_estimated_pomodoros() -> u32 {
    1
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority: TaskPriority::default(),
            estimated_pomodoros: default_estimated_pomodoros(),
            tags: None,
            issue_url: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_estimate(mut self, estimated_pomodoros: u32) -> Self {
        self.estimated_pomodoros = estimated_pomodoros;
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn with_issue_url(mut self, url: impl Into<String>) -> Self {
        self.issue_url = Some(url.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_estimate(self.estimated_pomodoros)
    }

    /// Build the record to insert; the id is assigned by the store.
    pub(crate) fn into_task(self, now: DateTime<Utc>) -> Task {
        Task {
            id: 0,
            title: self.title,
            description: self.description,
            status: TaskStatus::Todo,
            priority: self.priority,
            estimated_pomodoros: self.estimated_pomodoros,
            completed_pomodoros: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
            tags: self.tags,
            issue_url: self.issue_url,
        }
    }
}

/// Partial update for a task.
///
/// `None` leaves a field alone. For nullable fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub estimated_pomodoros: Option<u32>,
    pub completed_pomodoros: Option<u32>,
    pub tags: Option<Option<String>>,
    pub issue_url: Option<Option<String>>,
}

impl TaskPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(estimated) = self.estimated_pomodoros {
            validate_estimate(estimated)?;
        }
        Ok(())
    }
}
