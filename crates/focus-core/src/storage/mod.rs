mod config;
pub mod database;
pub mod migrations;
pub mod sessions;
pub mod tasks;

pub use config::{Config, DatabaseConfig, LoggingConfig, PagingConfig, PomodoroConfig};
pub use database::Database;

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// Returns the data directory, creating it if needed.
///
/// `FOCUS_DATA_DIR` wins outright. Otherwise `~/.config/focus-agent[-dev]/`
/// based on `FOCUS_ENV` (set `FOCUS_ENV=dev` for a separate development store).
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("FOCUS_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUS_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focus-agent-dev")
            } else {
                base_dir.join("focus-agent")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Fixed-width UTC text, so string order is time order and the first ten
/// bytes are the calendar date.
pub(crate) fn format_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Drop precision the store cannot keep, so returned records equal re-read ones.
pub(crate) fn storable(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(6)
}

pub(crate) fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

/// Decode a text column through the type's `FromStr`.
pub(crate) fn parse_enum<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = ValidationError>,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Offset/limit window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub skip: u64,
    pub limit: u32,
}

impl Pagination {
    /// Build a window, rejecting a limit outside `1..=max_limit`.
    pub fn new(skip: u64, limit: u32, max_limit: u32) -> Result<Self, ValidationError> {
        if limit == 0 || limit > max_limit {
            return Err(ValidationError::invalid(
                "limit",
                format!("must be between 1 and {max_limit}, got {limit}"),
            ));
        }
        Ok(Self { skip, limit })
    }
}

/// One page of a list query plus the unpaged match count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_sort_lexicographically() {
        let a = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        assert!(format_ts(a) < format_ts(b));
        assert_eq!(&format_ts(b)[..10], "2026-03-10");
        assert_eq!(parse_ts(0, &format_ts(a)).unwrap(), a);
    }

    #[test]
    fn pagination_bounds() {
        assert!(Pagination::new(0, 1, 1000).is_ok());
        assert!(Pagination::new(5, 1000, 1000).is_ok());
        assert!(Pagination::new(0, 0, 1000).is_err());
        assert!(Pagination::new(0, 1001, 1000).is_err());
    }
}
