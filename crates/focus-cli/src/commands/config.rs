use clap::Subcommand;
use focus_core::{Config, ConfigError};

use super::print_json;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the whole config
    Show,
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "pomodoro.work_duration")
        key: String,
    },
    /// Set a config value
    Set {
        /// Dot-separated key
        key: String,
        /// New value
        value: String,
    },
    /// Print the config file location
    Path,
}

/// Config commands resolve the file themselves: `path` never reads it and
/// `set` can repair a file that no longer loads.
pub fn run(action: ConfigAction) -> focus_core::Result<()> {
    match action {
        ConfigAction::Show => print_json(&Config::load()?),
        ConfigAction::Get { key } => match Config::load()?.get(&key) {
            Some(value) => {
                println!("{value}");
                Ok(())
            }
            None => Err(ConfigError::UnknownKey(key).into()),
        },
        ConfigAction::Set { key, value } => {
            let path = Config::path()?;
            let updated = Config::load_or_default_from(&path)?.with_value(&key, &value)?;
            updated.save_to(&path)?;
            tracing::info!(%key, %value, "updated config");
            println!("ok");
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
            Ok(())
        }
    }
}
