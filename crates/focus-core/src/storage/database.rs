//! SQLite connection and unit-of-work boundary.
//!
//! Every service operation runs inside one transaction obtained from
//! [`Database::unit_of_work`] (writes) or [`Database::snapshot`] (reads).
//! Table access lives in [`super::sessions`] and [`super::tasks`] and takes
//! the transaction as a plain `&Connection`.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use super::migrations;
use super::Config;
use crate::error::{DatabaseError, Result};

/// SQLite database holding tasks and pomodoro sessions.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database named by `config`, creating file and schema if needed.
    ///
    /// The busy timeout is in place before migrations run, so a schema check
    /// waits out another process's commit instead of failing.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.database_path()?;
        let conn = Self::connect(&path)?;
        conn.busy_timeout(Duration::from_millis(config.database.busy_timeout_ms))?;
        Self::from_connection(conn)
    }

    /// Open the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        Self::from_connection(Self::connect(path)?)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn connect(path: &Path) -> Result<Connection> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Run `work` in a write transaction.
    ///
    /// `BEGIN IMMEDIATE` takes the write lock up front, so two writers never
    /// interleave their read-then-write steps. Commits on `Ok`, rolls back on
    /// `Err` and returns the original error.
    ///
    /// # Errors
    /// Returns the closure's error, or a database error if the transaction
    /// cannot be opened or committed.
    pub fn unit_of_work<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        self.run_in(TransactionBehavior::Immediate, work)
    }

    /// Run `work` in a read transaction so multi-query reads see one state.
    ///
    /// # Errors
    /// Returns the closure's error, or a database error.
    pub fn snapshot<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        self.run_in(TransactionBehavior::Deferred, work)
    }

    fn run_in<T, F>(&mut self, behavior: TransactionBehavior, work: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let tx = self.conn.transaction_with_behavior(behavior)?;
        match work(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn count_tasks(db: &Database) -> i64 {
        db.conn()
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .unwrap()
    }

    fn insert_raw(tx: &Connection) -> Result<()> {
        tx.execute(
            "INSERT INTO tasks (title, created_at, updated_at) VALUES ('x', 'a', 'a')",
            [],
        )?;
        Ok(())
    }

    #[test]
    fn unit_of_work_commits_on_ok() {
        let mut db = Database::open_memory().unwrap();
        db.unit_of_work(|tx| insert_raw(tx)).unwrap();
        assert_eq!(count_tasks(&db), 1);
    }

    #[test]
    fn unit_of_work_rolls_back_on_err() {
        let mut db = Database::open_memory().unwrap();
        let result: Result<()> = db.unit_of_work(|tx| {
            insert_raw(tx)?;
            Err(ValidationError::invalid("title", "rejected after write").into())
        });
        assert!(result.is_err());
        assert_eq!(count_tasks(&db), 0);
    }

    #[test]
    fn open_applies_configured_busy_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.path = Some(dir.path().join("focus.db"));
        config.database.busy_timeout_ms = 1234;

        let db = Database::open(&config).unwrap();
        let timeout: i64 = db
            .conn()
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 1234);
        assert_eq!(
            migrations::get_schema_version(db.conn()).unwrap(),
            migrations::SCHEMA_VERSION
        );
    }

    #[test]
    fn open_waits_for_lock_held_during_migration_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focus.db");
        let mut config = Config::default();
        config.database.path = Some(path.clone());
        config.database.busy_timeout_ms = 2_000;
        drop(Database::open(&config).unwrap());

        // Hold an exclusive lock briefly from another connection.
        let holder = Connection::open(&path).unwrap();
        holder.execute_batch("BEGIN EXCLUSIVE").unwrap();
        let release = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(200));
            holder.execute_batch("COMMIT").unwrap();
        });

        let opened = Database::open(&config);
        release.join().unwrap();
        assert!(opened.is_ok());
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focus.db");
        {
            let mut db = Database::open_at(&path).unwrap();
            db.unit_of_work(|tx| insert_raw(tx)).unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(count_tasks(&db), 1);
    }
}
