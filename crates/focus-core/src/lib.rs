//! # Focus Core Library
//!
//! Session lifecycle, task bookkeeping and statistics for the Focus Agent
//! pomodoro tracker. The `focus-cli` binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Session Engine**: opens and closes pomodoro sessions, keeping at most
//!   one active at a time
//! - **Task Store**: tasks with estimated and credited pomodoros
//! - **Statistics**: aggregates over all stored sessions
//! - **Storage**: SQLite persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: session lifecycle and cycle planning
//! - [`TaskService`]: task CRUD and pomodoro crediting
//! - [`Database`]: unit-of-work boundary over SQLite
//! - [`Config`]: application configuration

pub mod error;
pub mod session;
pub mod stats;
pub mod storage;
pub mod task;

pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use session::engine::SessionQuery;
pub use session::{
    NewSession, PomodoroSession, SessionEngine, SessionPatch, SessionStatus, SessionType,
};
pub use stats::SessionStats;
pub use storage::{Config, Database, Page};
pub use task::{NewTask, Task, TaskPatch, TaskPriority, TaskService, TaskStatus};
