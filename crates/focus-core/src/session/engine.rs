//! Session engine: the only writer of session lifecycle state.
//!
//! Every public operation runs as one unit of work on the [`Database`].
//! Starting a session interrupts whatever is still active inside the same
//! transaction, so at most one session is ever active once it commits.

use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};

use super::{NewSession, PomodoroSession, SessionPatch, SessionStatus, SessionType};
use crate::error::{CoreError, Result};
use crate::stats::{self, SessionStats};
use crate::storage::sessions::{self, SessionFilter};
use crate::storage::{storable, Config, Database, Page, PagingConfig, Pagination, PomodoroConfig};

/// Filters and window for [`SessionEngine::list_sessions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionQuery {
    pub status: Option<SessionStatus>,
    pub task_id: Option<i64>,
    pub skip: u64,
    /// Falls back to `paging.default_limit`.
    pub limit: Option<u32>,
}

pub struct SessionEngine<C: Clock = DefaultClock> {
    clock: C,
    paging: PagingConfig,
    pomodoro: PomodoroConfig,
}

impl SessionEngine<DefaultClock> {
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, DefaultClock)
    }
}

impl<C: Clock> SessionEngine<C> {
    pub fn with_clock(config: &Config, clock: C) -> Self {
        Self {
            clock,
            paging: config.paging.clone(),
            pomodoro: config.pomodoro.clone(),
        }
    }

    /// Current time at storage precision.
    pub fn now(&self) -> DateTime<Utc> {
        storable(self.clock.utc())
    }

    /// Open a new active session, interrupting any still-active ones first.
    ///
    /// Auto-interrupted sessions get `ended_at` and `actual_duration` but
    /// their interruption counter is left alone.
    ///
    /// # Errors
    /// Validation errors are returned before anything is written.
    pub fn start_session(&self, db: &mut Database, new: NewSession) -> Result<PomodoroSession> {
        new.validate()?;
        let now = self.now();

        let session = db.unit_of_work(|tx| {
            let active = sessions::find_all(
                tx,
                &SessionFilter::default().with_status(SessionStatus::Active),
            )?;
            if active.len() > 1 {
                tracing::warn!(count = active.len(), "found more than one active session");
            }
            for stale in active {
                let id = stale.id;
                sessions::update(tx, &stale.finish(SessionStatus::Interrupted, now))?;
                tracing::info!(session_id = id, "auto-interrupted active session");
            }
            Ok(sessions::insert(tx, &new, now)?)
        })?;

        tracing::info!(
            session_id = session.id,
            session_type = %session.session_type,
            planned_duration = session.planned_duration,
            task_id = ?session.task_id,
            "started session"
        );
        Ok(session)
    }

    /// # Errors
    /// [`CoreError::NotFound`] if no such session exists.
    pub fn get_session(&self, db: &mut Database, id: i64) -> Result<PomodoroSession> {
        db.snapshot(|tx| {
            sessions::get(tx, id)?.ok_or_else(|| CoreError::not_found("session", id))
        })
    }

    /// Most recently started active session, if any.
    pub fn get_active_session(&self, db: &mut Database) -> Result<Option<PomodoroSession>> {
        db.snapshot(|tx| {
            let active = sessions::find_all(
                tx,
                &SessionFilter::default().with_status(SessionStatus::Active),
            )?;
            Ok(active.into_iter().next())
        })
    }

    /// Close a session as completed.
    ///
    /// Calling this on a closed session restamps `ended_at` and
    /// `actual_duration`. The linked task is not touched.
    pub fn complete_session(&self, db: &mut Database, id: i64) -> Result<PomodoroSession> {
        let now = self.now();
        let session = self.close(db, id, |s| s.finish(SessionStatus::Completed, now))?;
        tracing::info!(
            session_id = id,
            actual_duration = ?session.actual_duration,
            "completed session"
        );
        Ok(session)
    }

    /// Close a session as interrupted and bump its interruption count.
    pub fn interrupt_session(&self, db: &mut Database, id: i64) -> Result<PomodoroSession> {
        let now = self.now();
        let session = self.close(db, id, |s| s.interrupt(now))?;
        tracing::info!(
            session_id = id,
            interruptions = session.interruptions,
            "interrupted session"
        );
        Ok(session)
    }

    fn close<F>(&self, db: &mut Database, id: i64, transition: F) -> Result<PomodoroSession>
    where
        F: FnOnce(PomodoroSession) -> PomodoroSession,
    {
        db.unit_of_work(|tx| {
            let current =
                sessions::get(tx, id)?.ok_or_else(|| CoreError::not_found("session", id))?;
            let closed = transition(current);
            sessions::update(tx, &closed)?;
            Ok(closed)
        })
    }

    /// Write the patched fields as given. Fields are not checked against
    /// each other.
    pub fn update_session(
        &self,
        db: &mut Database,
        id: i64,
        patch: SessionPatch,
    ) -> Result<PomodoroSession> {
        patch.validate()?;
        db.unit_of_work(|tx| {
            let current =
                sessions::get(tx, id)?.ok_or_else(|| CoreError::not_found("session", id))?;
            let updated = current.apply_patch(patch)?;
            sessions::update(tx, &updated)?;
            tracing::debug!(session_id = id, "updated session");
            Ok(updated)
        })
    }

    /// Sessions newest first, with the total match count.
    pub fn list_sessions(
        &self,
        db: &mut Database,
        query: SessionQuery,
    ) -> Result<Page<PomodoroSession>> {
        let page = Pagination::new(
            query.skip,
            query.limit.unwrap_or(self.paging.default_limit),
            self.paging.max_limit,
        )?;
        let mut filter = SessionFilter::default();
        if let Some(status) = query.status {
            filter = filter.with_status(status);
        }
        if let Some(task_id) = query.task_id {
            filter = filter.with_task(task_id);
        }

        db.snapshot(|tx| {
            let (items, total) = sessions::list(tx, &filter, page)?;
            Ok(Page { items, total })
        })
    }

    pub fn get_stats(&self, db: &mut Database) -> Result<SessionStats> {
        let now = self.now();
        db.snapshot(|tx| Ok(stats::compute(tx, now)?))
    }

    /// Next session in the configured cycle after `previous`.
    ///
    /// Work N is followed by a break numbered N (long every
    /// `sessions_until_long_break` rounds); break N by work N+1.
    pub fn plan_next(&self, previous: Option<&PomodoroSession>) -> NewSession {
        let (session_type, session_number) = match previous {
            None => (SessionType::Work, 1),
            Some(prev) if prev.session_type == SessionType::Work => {
                let n = prev.session_number;
                let every = self.pomodoro.sessions_until_long_break.max(1);
                if n % every == 0 {
                    (SessionType::LongBreak, n)
                } else {
                    (SessionType::ShortBreak, n)
                }
            }
            Some(prev) => (SessionType::Work, prev.session_number.saturating_add(1)),
        };

        let mut next = NewSession::new(session_type, self.pomodoro.planned_seconds(session_type))
            .with_session_number(session_number);
        next.task_id = previous.and_then(|p| p.task_id);
        next
    }

    /// Seconds left on `session` right now.
    pub fn remaining_seconds(&self, session: &PomodoroSession) -> i64 {
        session.remaining_seconds(self.now())
    }
}

impl<C: Clock> std::fmt::Debug for SessionEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("paging", &self.paging)
            .field("pomodoro", &self.pomodoro)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SessionEngine {
        SessionEngine::new(&Config::default())
    }

    fn finished(session_type: SessionType, session_number: u32) -> PomodoroSession {
        PomodoroSession {
            id: 1,
            session_type,
            status: SessionStatus::Completed,
            planned_duration: 1500,
            actual_duration: Some(1500),
            started_at: Utc::now(),
            ended_at: None,
            task_id: Some(9),
            session_number,
            notes: None,
            interruptions: 0,
        }
    }

    #[test]
    fn plan_starts_with_work_one() {
        let next = engine().plan_next(None);
        assert_eq!(next.session_type, SessionType::Work);
        assert_eq!(next.session_number, 1);
        assert_eq!(next.planned_duration, 25 * 60);
        assert_eq!(next.task_id, None);
    }

    #[test]
    fn plan_follows_cycle() {
        let engine = engine();
        let after_work_1 = engine.plan_next(Some(&finished(SessionType::Work, 1)));
        assert_eq!(after_work_1.session_type, SessionType::ShortBreak);
        assert_eq!(after_work_1.session_number, 1);
        assert_eq!(after_work_1.planned_duration, 5 * 60);
        assert_eq!(after_work_1.task_id, Some(9));

        let after_work_4 = engine.plan_next(Some(&finished(SessionType::Work, 4)));
        assert_eq!(after_work_4.session_type, SessionType::LongBreak);
        assert_eq!(after_work_4.planned_duration, 15 * 60);

        let after_break = engine.plan_next(Some(&finished(SessionType::LongBreak, 4)));
        assert_eq!(after_break.session_type, SessionType::Work);
        assert_eq!(after_break.session_number, 5);
    }

    #[test]
    fn start_rejects_short_plan_without_writing() {
        let mut db = Database::open_memory().unwrap();
        let engine = engine();
        engine
            .start_session(&mut db, NewSession::new(SessionType::Work, 1500))
            .unwrap();

        let err = engine
            .start_session(&mut db, NewSession::new(SessionType::Work, 30))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(engine.get_active_session(&mut db).unwrap().is_some());
    }

    #[test]
    fn missing_session_is_not_found() {
        let mut db = Database::open_memory().unwrap();
        let engine = engine();
        assert!(engine.get_session(&mut db, 3).unwrap_err().is_not_found());
        assert!(engine.complete_session(&mut db, 3).unwrap_err().is_not_found());
        assert!(engine.interrupt_session(&mut db, 3).unwrap_err().is_not_found());
        assert!(engine
            .update_session(&mut db, 3, SessionPatch::default())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn list_rejects_oversized_limit() {
        let mut db = Database::open_memory().unwrap();
        let err = engine()
            .list_sessions(
                &mut db,
                SessionQuery {
                    limit: Some(1001),
                    ..SessionQuery::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
    }
}
