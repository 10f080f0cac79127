//! Database schema migrations.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;
    tracing::debug!(current_version, target_version = SCHEMA_VERSION, "checking schema");

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 for a database that has never been migrated.
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: base tables.
///
/// `pomodoro_sessions.task_id` deliberately carries no foreign key: deleting
/// a task leaves its sessions pointing at nothing.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            title               TEXT NOT NULL,
            description         TEXT,
            status              TEXT NOT NULL DEFAULT 'todo',
            priority            TEXT NOT NULL DEFAULT 'medium',
            estimated_pomodoros INTEGER NOT NULL DEFAULT 1,
            completed_pomodoros INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL,
            completed_at        TEXT,
            tags                TEXT,
            issue_url           TEXT
        );

        CREATE TABLE IF NOT EXISTS pomodoro_sessions (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            session_type     TEXT NOT NULL,
            status           TEXT NOT NULL DEFAULT 'active',
            planned_duration INTEGER NOT NULL,
            actual_duration  INTEGER,
            started_at       TEXT NOT NULL,
            ended_at         TEXT,
            task_id          INTEGER,
            session_number   INTEGER NOT NULL DEFAULT 1,
            notes            TEXT,
            interruptions    INTEGER NOT NULL DEFAULT 0
        );",
    )?;
    set_schema_version(&tx, 1)?;

    tx.commit()?;
    tracing::debug!("applied schema v1");
    Ok(())
}

/// Migration v2: indexes for the list, active-lookup and stats queries.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_sessions_status ON pomodoro_sessions(status);
         CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON pomodoro_sessions(started_at);
         CREATE INDEX IF NOT EXISTS idx_sessions_task_id ON pomodoro_sessions(task_id);
         CREATE INDEX IF NOT EXISTS idx_sessions_type_started_at
             ON pomodoro_sessions(session_type, started_at);
         CREATE INDEX IF NOT EXISTS idx_tasks_status_created_at ON tasks(status, created_at);",
    )?;
    set_schema_version(&tx, 2)?;

    tx.commit()?;
    tracing::debug!("applied schema v2");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%' ORDER BY name")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        names
    }

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        let indexes = index_names(&conn);
        assert!(indexes.contains(&"idx_sessions_status".to_string()));
        assert!(indexes.contains(&"idx_tasks_status_created_at".to_string()));

        // Both tables accept rows with only the required columns.
        conn.execute(
            "INSERT INTO tasks (title, created_at, updated_at) VALUES ('t', 'x', 'x')",
            [],
        )
        .unwrap();
        let (status, estimated): (String, i64) = conn
            .query_row("SELECT status, estimated_pomodoros FROM tasks", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(status, "todo");
        assert_eq!(estimated, 1);
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_incremental_migration() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
        assert!(index_names(&conn).is_empty());

        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 2);
        assert!(!index_names(&conn).is_empty());
    }
}
