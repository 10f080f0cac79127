use focus_core::{Config, Database, SessionEngine};

use super::print_json;

pub fn run(config: &Config, db: &mut Database) -> focus_core::Result<()> {
    let stats = SessionEngine::new(config).get_stats(db)?;
    print_json(&stats)
}
