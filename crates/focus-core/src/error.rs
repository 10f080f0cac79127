//! Core error types for focus-core.
//!
//! Every fallible operation in the library returns [`CoreError`]. The
//! variants map onto the three failure classes callers care about:
//! a missing record, rejected input, and a store failure.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focus-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Input rejected before any state mutation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        CoreError::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }

    /// HTTP-equivalent status for transports.
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::NotFound { .. } => 404,
            CoreError::Validation(_) => 422,
            _ => 500,
        }
    }

    /// Message safe to show a caller.
    ///
    /// Server-class failures only expose their detail when `debug` is set.
    pub fn public_message(&self, debug: bool) -> String {
        if self.status_code() >= 500 && !debug {
            "internal error".to_string()
        } else {
            self.to_string()
        }
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored value could not be decoded
    #[error("Corrupt value in column '{column}': {value}")]
    Corrupt { column: String, value: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy
                ) =>
            {
                DatabaseError::Locked
            }
            rusqlite::Error::FromSqlConversionFailure(idx, _, inner) => DatabaseError::Corrupt {
                column: format!("#{idx}"),
                value: inner.to_string(),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_class() {
        assert_eq!(CoreError::not_found("session", 7).status_code(), 404);
        assert_eq!(
            CoreError::from(ValidationError::invalid("title", "must not be empty")).status_code(),
            422
        );
        assert_eq!(CoreError::from(DatabaseError::Locked).status_code(), 500);
    }

    #[test]
    fn server_errors_hide_detail_outside_debug() {
        let err = CoreError::from(DatabaseError::QueryFailed("no such table: tasks".into()));
        assert_eq!(err.public_message(false), "internal error");
        assert!(err.public_message(true).contains("no such table"));

        let missing = CoreError::not_found("task", 3);
        assert_eq!(missing.public_message(false), "task 3 not found");
    }

    #[test]
    fn locked_sqlite_error_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(DatabaseError::from(err), DatabaseError::Locked));
    }
}
