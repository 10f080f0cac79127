use std::process::ExitCode;

use clap::{Parser, Subcommand};
use focus_core::{Config, CoreError, Database};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focus-cli", version, about = "Focus Agent CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pomodoro session lifecycle
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Session statistics
    Stats,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// `RUST_LOG` wins; otherwise the configured level, or `debug` in debug mode.
fn init_tracing(config: Option<&Config>) {
    let default_level = match config {
        Some(config) if config.debug => "debug",
        Some(config) => config.logging.level.as_str(),
        None => "info",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(command: Commands, config: &Config) -> focus_core::Result<()> {
    match command {
        Commands::Config { action } => commands::config::run(action),
        Commands::Session { action } => {
            let mut db = Database::open(config)?;
            commands::session::run(action, config, &mut db)
        }
        Commands::Task { action } => {
            let mut db = Database::open(config)?;
            commands::task::run(action, config, &mut db)
        }
        Commands::Stats => {
            let mut db = Database::open(config)?;
            commands::stats::run(config, &mut db)
        }
    }
}

fn fail(err: &CoreError, debug: bool) -> ExitCode {
    if err.status_code() >= 500 {
        tracing::error!(error = %err, "command failed");
    }
    eprintln!("error: {}", err.public_message(debug));
    ExitCode::from(commands::exit_code(err))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config commands must work even when config.toml does not load.
    if matches!(cli.command, Commands::Config { .. }) {
        init_tracing(None);
        return match run(cli.command, &Config::default()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => fail(&err, false),
        };
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            init_tracing(None);
            return fail(&err, false);
        }
    };
    init_tracing(Some(&config));

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(&err, config.debug),
    }
}
