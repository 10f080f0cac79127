//! Shared fixtures for focus-core integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use focus_core::{Config, Database, SessionEngine, TaskService};
use mockable::Clock;

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap() = to;
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub db: Database,
    pub clock: ManualClock,
    pub engine: SessionEngine<ManualClock>,
    pub tasks: TaskService<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::starting_at(morning())
    }

    pub fn starting_at(now: DateTime<Utc>) -> Self {
        let config = Config::default();
        let clock = ManualClock::at(now);
        Self {
            db: Database::open_memory().unwrap(),
            engine: SessionEngine::with_clock(&config, clock.clone()),
            tasks: TaskService::with_clock(&config, clock.clone()),
            clock,
        }
    }
}
