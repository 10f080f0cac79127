pub mod config;
pub mod session;
pub mod stats;
pub mod task;

use focus_core::CoreError;
use serde::Serialize;

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> focus_core::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Process exit code for a failed command.
pub fn exit_code(err: &CoreError) -> u8 {
    match err.status_code() {
        404 => 4,
        422 => 3,
        _ => 1,
    }
}

/// Fold a value flag and its `--clear-*` twin into a nullable patch field.
pub fn nullable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    match (value, clear) {
        (Some(value), _) => Some(Some(value)),
        (None, true) => Some(None),
        (None, false) => None,
    }
}
