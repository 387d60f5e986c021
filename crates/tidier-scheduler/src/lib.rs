//! Daily re-invocation of the triage run with catch-up-skip semantics.
//!
//! Fire times that have already passed when checked are skipped instead of
//! replayed, so a run that overruns its slot never causes back-to-back or
//! overlapping runs.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use thiserror::Error;
use tracing::{info, warn};

/// Cron expression (seconds field included) for midnight UTC every day.
pub const DEFAULT_SCHEDULE: &str = "0 0 0 * * *";
pub const MAX_SLEEP_STEP: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Enumerates supported `ScheduleError` values.
pub enum ScheduleError {
    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Public struct `NextFire` used across Tidier components.
pub struct NextFire {
    pub at: DateTime<Utc>,
    /// Fire times passed over because they were already in the past.
    pub skipped: usize,
}

#[derive(Debug, Clone)]
/// Public struct `CatchUpSkipSchedule` used across Tidier components.
pub struct CatchUpSkipSchedule {
    expression: String,
    schedule: Schedule,
    cursor: DateTime<Utc>,
}

impl CatchUpSkipSchedule {
    pub fn new(expression: &str, start: DateTime<Utc>) -> Result<Self, ScheduleError> {
        let schedule =
            Schedule::from_str(expression).map_err(|error| ScheduleError::InvalidExpression {
                expression: expression.to_string(),
                reason: error.to_string(),
            })?;
        Ok(Self {
            expression: expression.to_string(),
            schedule,
            cursor: start,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Advances to the first fire time not earlier than `now`. Returns `None`
    /// when the expression has no further occurrences.
    pub fn next_fire(&mut self, now: DateTime<Utc>) -> Option<NextFire> {
        let mut skipped = 0;
        loop {
            let at = self.schedule.after(&self.cursor).next()?;
            self.cursor = at;
            if at < now {
                skipped += 1;
                continue;
            }
            return Some(NextFire { at, skipped });
        }
    }
}

/// Time source for the schedule loop.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
/// Public struct `SystemClock` used across Tidier components.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Runs `job` at every fire time until `max_runs` jobs have run (forever when
/// `None`). Job errors are logged and never stop the loop. Returns the number
/// of jobs run.
pub fn run_schedule<C, F, E>(
    schedule: &mut CatchUpSkipSchedule,
    clock: &C,
    max_runs: Option<usize>,
    mut job: F,
) -> usize
where
    C: Clock,
    F: FnMut() -> Result<(), E>,
    E: Display,
{
    let mut runs = 0_usize;
    while max_runs.map_or(true, |max| runs < max) {
        let Some(fire) = schedule.next_fire(clock.now()) else {
            warn!(
                expression = schedule.expression(),
                "schedule has no future fire time"
            );
            break;
        };
        if fire.skipped > 0 {
            warn!(skipped = fire.skipped, "previous run overran; skipping missed fire times");
        }
        info!(next = %fire.at, "next invocation scheduled");
        wait_until(clock, fire.at);
        if let Err(error) = job() {
            warn!(%error, "scheduled run failed");
        }
        runs += 1;
    }
    runs
}

fn wait_until<C: Clock>(clock: &C, at: DateTime<Utc>) {
    loop {
        let now = clock.now();
        if now >= at {
            return;
        }
        let remaining = (at - now).to_std().unwrap_or(Duration::ZERO);
        clock.sleep(remaining.min(MAX_SLEEP_STEP));
    }
}
