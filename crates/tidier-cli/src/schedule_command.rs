use std::io::Write;

use anyhow::Result;
use chrono::Utc;
use tidier_scheduler::{run_schedule, CatchUpSkipSchedule, SystemClock};
use tidier_triage::render_config_summary;
use tracing::info;

use crate::cli_args::{ScheduleArgs, TriageArgs};
use crate::run_command::run_triage_pass;

/// Validates once, then re-runs triage at every fire time. Failed runs are
/// logged by the scheduler and do not stop it.
pub(crate) fn execute_schedule_command(args: &TriageArgs, schedule: &ScheduleArgs) -> Result<()> {
    let config = args.raw_config().validate()?;
    let mut cron_schedule = CatchUpSkipSchedule::new(&schedule.cron, Utc::now())?;

    {
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "{}", render_config_summary(&config))?;
        writeln!(stdout, "Schedule")?;
        writeln!(stdout, "  {} (UTC)", cron_schedule.expression())?;
        writeln!(stdout)?;
        stdout.flush()?;
    }

    let runs = run_schedule(
        &mut cron_schedule,
        &SystemClock,
        schedule.max_runs,
        || -> Result<()> {
            let mut stdout = std::io::stdout().lock();
            run_triage_pass(args, &config, &mut stdout).map(|_| ())
        },
    );
    info!(runs, "scheduler stopped");
    Ok(())
}
