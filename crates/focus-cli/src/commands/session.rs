use chrono::{DateTime, Utc};
use clap::Subcommand;
use focus_core::{
    Config, Database, NewSession, PomodoroSession, SessionEngine, SessionPatch, SessionQuery,
    SessionStatus, SessionType,
};
use serde::Serialize;

use super::{nullable, print_json};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a session, interrupting any active one
    Start {
        /// work, short_break or long_break
        #[arg(long = "type", default_value = "work")]
        session_type: SessionType,
        /// Planned length in seconds (defaults to the configured length)
        #[arg(long)]
        duration: Option<u32>,
        /// Task to link
        #[arg(long)]
        task: Option<i64>,
        /// Position in the pomodoro cycle
        #[arg(long, default_value_t = 1)]
        number: u32,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show a session
    Get { id: i64 },
    /// Show the active session, or null
    Active,
    /// Mark a session completed
    Complete { id: i64 },
    /// Mark a session interrupted
    Interrupt { id: i64 },
    /// Overwrite session fields
    Update {
        id: i64,
        #[arg(long)]
        status: Option<SessionStatus>,
        /// Seconds
        #[arg(long, conflicts_with = "clear_actual_duration")]
        actual_duration: Option<i64>,
        #[arg(long)]
        clear_actual_duration: bool,
        /// RFC 3339 timestamp
        #[arg(long, conflicts_with = "clear_ended_at")]
        ended_at: Option<DateTime<Utc>>,
        #[arg(long)]
        clear_ended_at: bool,
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        #[arg(long)]
        clear_notes: bool,
        #[arg(long)]
        interruptions: Option<u32>,
    },
    /// List sessions, newest first
    List {
        #[arg(long)]
        status: Option<SessionStatus>,
        #[arg(long)]
        task: Option<i64>,
        #[arg(long, default_value_t = 0)]
        skip: u64,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Plan the next session in the cycle
    Next {
        /// Start the planned session right away
        #[arg(long)]
        start: bool,
    },
}

#[derive(Serialize)]
struct ActiveView<'a> {
    #[serde(flatten)]
    session: &'a PomodoroSession,
    remaining_seconds: i64,
}

pub fn run(action: SessionAction, config: &Config, db: &mut Database) -> focus_core::Result<()> {
    let engine = SessionEngine::new(config);

    match action {
        SessionAction::Start {
            session_type,
            duration,
            task,
            number,
            notes,
        } => {
            let planned = duration.unwrap_or_else(|| config.pomodoro.planned_seconds(session_type));
            let mut new = NewSession::new(session_type, planned).with_session_number(number);
            new.task_id = task;
            new.notes = notes;
            print_json(&engine.start_session(db, new)?)
        }
        SessionAction::Get { id } => print_json(&engine.get_session(db, id)?),
        SessionAction::Active => match engine.get_active_session(db)? {
            Some(session) => print_json(&ActiveView {
                remaining_seconds: engine.remaining_seconds(&session),
                session: &session,
            }),
            None => print_json(&Option::<PomodoroSession>::None),
        },
        SessionAction::Complete { id } => print_json(&engine.complete_session(db, id)?),
        SessionAction::Interrupt { id } => print_json(&engine.interrupt_session(db, id)?),
        SessionAction::Update {
            id,
            status,
            actual_duration,
            clear_actual_duration,
            ended_at,
            clear_ended_at,
            notes,
            clear_notes,
            interruptions,
        } => {
            let patch = SessionPatch {
                status,
                actual_duration: nullable(actual_duration, clear_actual_duration),
                ended_at: nullable(ended_at, clear_ended_at),
                notes: nullable(notes, clear_notes),
                interruptions,
            };
            print_json(&engine.update_session(db, id, patch)?)
        }
        SessionAction::List {
            status,
            task,
            skip,
            limit,
        } => {
            let query = SessionQuery {
                status,
                task_id: task,
                skip,
                limit,
            };
            print_json(&engine.list_sessions(db, query)?)
        }
        SessionAction::Next { start } => {
            let latest = engine.list_sessions(
                db,
                SessionQuery {
                    limit: Some(1),
                    ..SessionQuery::default()
                },
            )?;
            let plan = engine.plan_next(latest.items.first());
            if start {
                print_json(&engine.start_session(db, plan)?)
            } else {
                print_json(&plan)
            }
        }
    }
}
