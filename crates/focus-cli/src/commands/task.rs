use clap::Subcommand;
use focus_core::{Config, Database, NewTask, TaskPatch, TaskPriority, TaskService, TaskStatus};

use super::{nullable, print_json};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a task
    Create {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// low, medium, high or urgent
        #[arg(long, default_value = "medium")]
        priority: TaskPriority,
        /// Estimated pomodoros
        #[arg(long, default_value_t = 1)]
        estimate: u32,
        /// Free-form tag string
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        issue_url: Option<String>,
    },
    /// Show a task
    Get { id: i64 },
    /// List tasks, newest first
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long, default_value_t = 0)]
        skip: u64,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Update task fields
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        priority: Option<TaskPriority>,
        #[arg(long)]
        estimate: Option<u32>,
        /// Overwrite the credited pomodoro count
        #[arg(long)]
        completed_pomodoros: Option<u32>,
        #[arg(long, conflicts_with = "clear_tags")]
        tags: Option<String>,
        #[arg(long)]
        clear_tags: bool,
        #[arg(long, conflicts_with = "clear_issue_url")]
        issue_url: Option<String>,
        #[arg(long)]
        clear_issue_url: bool,
    },
    /// Delete a task; linked sessions are kept
    Delete { id: i64 },
    /// Mark a task completed
    Complete { id: i64 },
    /// Credit one finished pomodoro
    Increment { id: i64 },
}

pub fn run(action: TaskAction, config: &Config, db: &mut Database) -> focus_core::Result<()> {
    let service = TaskService::new(config);

    match action {
        TaskAction::Create {
            title,
            description,
            priority,
            estimate,
            tags,
            issue_url,
        } => {
            let mut new = NewTask::new(title)
                .with_priority(priority)
                .with_estimate(estimate);
            if let Some(description) = description {
                new = new.with_description(description);
            }
            if let Some(tags) = tags {
                new = new.with_tags(tags);
            }
            if let Some(issue_url) = issue_url {
                new = new.with_issue_url(issue_url);
            }
            print_json(&service.create_task(db, new)?)
        }
        TaskAction::Get { id } => print_json(&service.get_task(db, id)?),
        TaskAction::List {
            status,
            skip,
            limit,
        } => print_json(&service.list_tasks(db, status, skip, limit)?),
        TaskAction::Update {
            id,
            title,
            description,
            clear_description,
            status,
            priority,
            estimate,
            completed_pomodoros,
            tags,
            clear_tags,
            issue_url,
            clear_issue_url,
        } => {
            let patch = TaskPatch {
                title,
                description: nullable(description, clear_description),
                status,
                priority,
                estimated_pomodoros: estimate,
                completed_pomodoros,
                tags: nullable(tags, clear_tags),
                issue_url: nullable(issue_url, clear_issue_url),
            };
            print_json(&service.update_task(db, id, patch)?)
        }
        TaskAction::Delete { id } => {
            service.delete_task(db, id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        TaskAction::Complete { id } => print_json(&service.complete_task(db, id)?),
        TaskAction::Increment { id } => print_json(&service.increment_pomodoro(db, id)?),
    }
}
