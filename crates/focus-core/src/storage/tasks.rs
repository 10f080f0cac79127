//! `tasks` table access.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{format_ts, parse_enum, parse_opt_ts, parse_ts, Pagination};
use crate::task::{Task, TaskStatus};

const COLUMNS: &str = "id, title, description, status, priority, estimated_pomodoros,
                       completed_pomodoros, created_at, updated_at, completed_at, tags, issue_url";

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let status: String = row.get(3)?;
    let priority: String = row.get(4)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: parse_enum(3, &status)?,
        priority: parse_enum(4, &priority)?,
        estimated_pomodoros: row.get(5)?,
        completed_pomodoros: row.get(6)?,
        created_at: parse_ts(7, &created_at)?,
        updated_at: parse_ts(8, &updated_at)?,
        completed_at: parse_opt_ts(9, row.get(9)?)?,
        tags: row.get(10)?,
        issue_url: row.get(11)?,
    })
}

/// Insert `task` ignoring its id; returns the stored record.
pub fn insert(conn: &Connection, task: Task) -> rusqlite::Result<Task> {
    conn.execute(
        "INSERT INTO tasks (
            title, description, status, priority, estimated_pomodoros,
            completed_pomodoros, created_at, updated_at, completed_at, tags, issue_url
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            task.title,
            task.description,
            task.status.as_str(),
            task.priority.as_str(),
            task.estimated_pomodoros,
            task.completed_pomodoros,
            format_ts(task.created_at),
            format_ts(task.updated_at),
            task.completed_at.map(format_ts),
            task.tags,
            task.issue_url,
        ],
    )?;
    Ok(Task {
        id: conn.last_insert_rowid(),
        ..task
    })
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Task>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM tasks WHERE id = ?1"),
        params![id],
        row_to_task,
    )
    .optional()
}

/// Tasks newest first, optionally by status, plus the unpaged match count.
pub fn list(
    conn: &Connection,
    status: Option<TaskStatus>,
    page: Pagination,
) -> rusqlite::Result<(Vec<Task>, u64)> {
    let mut values = Vec::new();
    let where_sql = match status {
        Some(status) => {
            values.push(Value::Text(status.as_str().to_string()));
            " WHERE status = ?"
        }
        None => "",
    };

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM tasks{where_sql}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    values.push(Value::Integer(i64::from(page.limit)));
    values.push(Value::Integer(i64::try_from(page.skip).unwrap_or(i64::MAX)));
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM tasks{where_sql}
         ORDER BY created_at DESC, id DESC
         LIMIT ? OFFSET ?"
    ))?;
    let items = stmt
        .query_map(params_from_iter(values.iter()), row_to_task)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok((items, u64::try_from(total).unwrap_or(0)))
}

/// Write back every mutable column of an existing row.
pub fn update(conn: &Connection, task: &Task) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE tasks
         SET title = ?2, description = ?3, status = ?4, priority = ?5,
             estimated_pomodoros = ?6, completed_pomodoros = ?7, updated_at = ?8,
             completed_at = ?9, tags = ?10, issue_url = ?11
         WHERE id = ?1",
        params![
            task.id,
            task.title,
            task.description,
            task.status.as_str(),
            task.priority.as_str(),
            task.estimated_pomodoros,
            task.completed_pomodoros,
            format_ts(task.updated_at),
            task.completed_at.map(format_ts),
            task.tags,
            task.issue_url,
        ],
    )?;
    Ok(())
}

/// Returns whether a row was removed. Sessions referencing it are left alone.
pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let removed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}
