//! Task store operations.

use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};

use super::{NewTask, Task, TaskPatch, TaskStatus};
use crate::error::{CoreError, Result};
use crate::storage::tasks;
use crate::storage::{storable, Config, Database, Page, PagingConfig, Pagination};

/// Task CRUD plus pomodoro crediting, one transaction per call.
pub struct TaskService<C: Clock = DefaultClock> {
    clock: C,
    paging: PagingConfig,
}

impl TaskService<DefaultClock> {
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, DefaultClock)
    }
}

impl<C: Clock> TaskService<C> {
    pub fn with_clock(config: &Config, clock: C) -> Self {
        Self {
            clock,
            paging: config.paging.clone(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        storable(self.clock.utc())
    }

    pub fn create_task(&self, db: &mut Database, new: NewTask) -> Result<Task> {
        new.validate()?;
        let task = new.into_task(self.now());
        let task = db.unit_of_work(|tx| Ok(tasks::insert(tx, task)?))?;
        tracing::info!(task_id = task.id, title = %task.title, "created task");
        Ok(task)
    }

    pub fn get_task(&self, db: &mut Database, id: i64) -> Result<Task> {
        db.snapshot(|tx| tasks::get(tx, id)?.ok_or_else(|| CoreError::not_found("task", id)))
    }

    pub fn list_tasks(
        &self,
        db: &mut Database,
        status: Option<TaskStatus>,
        skip: u64,
        limit: Option<u32>,
    ) -> Result<Page<Task>> {
        let page = Pagination::new(
            skip,
            limit.unwrap_or(self.paging.default_limit),
            self.paging.max_limit,
        )?;
        db.snapshot(|tx| {
            let (items, total) = tasks::list(tx, status, page)?;
            Ok(Page { items, total })
        })
    }

    /// Apply `patch`. Setting status to completed keeps an existing
    /// `completed_at`; any other status clears it.
    pub fn update_task(&self, db: &mut Database, id: i64, patch: TaskPatch) -> Result<Task> {
        patch.validate()?;
        let now = self.now();
        db.unit_of_work(|tx| {
            let current = tasks::get(tx, id)?.ok_or_else(|| CoreError::not_found("task", id))?;
            let updated = current.apply_patch(patch, now)?;
            tasks::update(tx, &updated)?;
            tracing::debug!(task_id = id, status = %updated.status, "updated task");
            Ok(updated)
        })
    }

    /// Hard delete. Sessions that reference the task keep their `task_id`.
    pub fn delete_task(&self, db: &mut Database, id: i64) -> Result<()> {
        db.unit_of_work(|tx| {
            if tasks::delete(tx, id)? {
                Ok(())
            } else {
                Err(CoreError::not_found("task", id))
            }
        })?;
        tracing::info!(task_id = id, "deleted task");
        Ok(())
    }

    /// Mark completed, overwriting any earlier `completed_at`.
    pub fn complete_task(&self, db: &mut Database, id: i64) -> Result<Task> {
        let now = self.now();
        let task = self.modify(db, id, |task| task.mark_completed(now))?;
        tracing::info!(task_id = id, "completed task");
        Ok(task)
    }

    /// Credit one finished pomodoro, completing the task when this
    /// increment reaches its estimate.
    pub fn increment_pomodoro(&self, db: &mut Database, id: i64) -> Result<Task> {
        let now = self.now();
        let task = self.modify(db, id, |task| task.record_pomodoro(now))?;
        tracing::info!(
            task_id = id,
            completed_pomodoros = task.completed_pomodoros,
            estimated_pomodoros = task.estimated_pomodoros,
            status = %task.status,
            "recorded pomodoro"
        );
        Ok(task)
    }

    fn modify<F>(&self, db: &mut Database, id: i64, change: F) -> Result<Task>
    where
        F: FnOnce(Task) -> Task,
    {
        db.unit_of_work(|tx| {
            let current = tasks::get(tx, id)?.ok_or_else(|| CoreError::not_found("task", id))?;
            let updated = change(current);
            tasks::update(tx, &updated)?;
            Ok(updated)
        })
    }
}

impl<C: Clock> std::fmt::Debug for TaskService<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService")
            .field("paging", &self.paging)
            .finish_non_exhaustive()
    }
}
