use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tidier_core::TidierConfig;
use tidier_github_issues::{closer_for_strategy, GithubApiClient};
use tidier_triage::{
    render_config_summary, render_run_report, render_timestamp, run_triage, RunReport,
    TriageServices, WebhookNotifier,
};

use crate::cli_args::TriageArgs;

/// Validates the configuration before any network call, then runs once.
pub(crate) fn execute_run_command(args: &TriageArgs) -> Result<()> {
    let config = args.raw_config().validate()?;
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{}", render_config_summary(&config))?;
    run_triage_pass(args, &config, &mut stdout)?;
    Ok(())
}

/// One triage pass with fresh clients, so caches never outlive a run.
pub(crate) fn run_triage_pass(
    args: &TriageArgs,
    config: &TidierConfig,
    out: &mut dyn Write,
) -> Result<RunReport> {
    let now = Utc::now();
    write!(out, "{}", render_timestamp(now))?;
    out.flush()?;

    let client = GithubApiClient::new(&args.client_config(config.access_token()))?;
    let closer = closer_for_strategy(&client, config.close_strategy());
    let notifier = WebhookNotifier::new(Duration::from_millis(args.request_timeout_ms))
        .context("failed to build webhook client")?;
    let services = TriageServices {
        tracker: &client,
        closer: closer.as_ref(),
        notifier: &notifier,
    };

    let report = run_triage(&services, config, now)?;
    write!(out, "{}", render_run_report(&report))?;
    out.flush()?;
    Ok(report)
}
