//! TOML-based application configuration.
//!
//! Holds:
//! - Database location and lock wait
//! - Paging limits for list operations
//! - Pomodoro cycle lengths used when planning sessions
//! - Log level and debug mode
//!
//! Configuration is stored at `<data_dir>/config.toml`. It is read once at
//! startup and handed to the services by reference; nothing mutates it at
//! runtime.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError, Result};
use crate::session::SessionType;

/// Upper bound on any page size, whatever the config says.
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Database configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file. Defaults to `<data_dir>/focus.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// How long a writer waits for the SQLite lock.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Paging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagingConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

/// Pomodoro cycle configuration, durations in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PomodoroConfig {
    #[serde(default = "default_work_duration")]
    pub work_duration: u32,
    #[serde(default = "default_short_break")]
    pub short_break: u32,
    #[serde(default = "default_long_break")]
    pub long_break: u32,
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Expose internal error detail to callers.
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub pomodoro: PomodoroConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}
fn default_limit() -> u32 {
    100
}
fn default_max_limit() -> u32 {
    MAX_PAGE_LIMIT
}
fn default_work_duration() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_sessions_until_long_break() -> u32 {
    4
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            work_duration: default_work_duration(),
            short_break: default_short_break(),
            long_break: default_long_break(),
            sessions_until_long_break: default_sessions_until_long_break(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl PomodoroConfig {
    /// Planned length in seconds for a session of this type.
    pub fn planned_seconds(&self, session_type: SessionType) -> u32 {
        let minutes = match session_type {
            SessionType::Work => self.work_duration,
            SessionType::ShortBreak => self.short_break,
            SessionType::LongBreak => self.long_break,
        };
        minutes.saturating_mul(60)
    }
}

impl Config {
    /// Default config location.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Database file, falling back to `<data_dir>/focus.db`.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("focus.db")),
        }
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or fails
    /// validation, or if the default config cannot be written.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)
                    .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Like [`Config::load_from`], but an unreadable or invalid file yields
    /// the defaults so it can be overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures outside the config file itself.
    pub fn load_or_default_from(path: &Path) -> Result<Self> {
        match Self::load_from(path) {
            Ok(cfg) => Ok(cfg),
            Err(CoreError::Config(err)) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring unusable config file");
                Ok(Self::default())
            }
            Err(err) => Err(err),
        }
    }

    /// Persist to the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Reject values the services cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };

        if self.paging.max_limit == 0 || self.paging.max_limit > MAX_PAGE_LIMIT {
            return Err(invalid("paging.max_limit", "must be between 1 and 1000"));
        }
        if self.paging.default_limit == 0 || self.paging.default_limit > self.paging.max_limit {
            return Err(invalid(
                "paging.default_limit",
                "must be between 1 and paging.max_limit",
            ));
        }
        for (key, minutes) in [
            ("pomodoro.work_duration", self.pomodoro.work_duration),
            ("pomodoro.short_break", self.pomodoro.short_break),
            ("pomodoro.long_break", self.pomodoro.long_break),
        ] {
            if minutes == 0 {
                return Err(invalid(key, "must be at least 1 minute"));
            }
        }
        if self.pomodoro.sessions_until_long_break == 0 {
            return Err(invalid("pomodoro.sessions_until_long_break", "must be at least 1"));
        }
        Ok(())
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }
        key.split('.').try_fold(root, |current, part| current.get(part))
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent_path, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut parent = root;
        if let Some(parent_path) = parent_path {
            for part in parent_path.split('.') {
                parent = parent.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let obj = parent.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
            ),
            serde_json::Value::Number(_) => value
                .parse::<u64>()
                .map(|n| serde_json::Value::Number(n.into()))
                .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
            // Null only occurs for unset optional paths.
            serde_json::Value::String(_) | serde_json::Value::Null => {
                serde_json::Value::String(value.into())
            }
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                return Err(invalid("cannot set a whole section".into()))
            }
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match Self::get_json_value_by_path(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Return a copy with one dot-separated key replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value does not parse as
    /// the key's type, or the resulting config fails validation.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Self, ConfigError> {
        let mut json =
            serde_json::to_value(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        Ok(updated)
    }
}
