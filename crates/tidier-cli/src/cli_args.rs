use clap::{Args, Parser, Subcommand};
use tidier_core::RawConfig;
use tidier_github_issues::{GithubClientConfig, DEFAULT_GITHUB_API_BASE, DEFAULT_GITHUB_GRAPHQL_URL};
use tidier_scheduler::DEFAULT_SCHEDULE;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "tidier",
    about = "Close stale labeled GitHub issues and pull requests",
    version
)]
/// Public struct `Cli` used across Tidier components.
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    #[command(flatten)]
    pub triage: TriageArgs,
}

#[derive(Debug, Subcommand)]
/// Enumerates supported `CliCommand` values.
pub enum CliCommand {
    /// Run one triage pass and exit (the default).
    Run,
    /// Re-run triage on a cron schedule, skipping fire times missed by an overrunning run.
    Schedule(ScheduleArgs),
}

#[derive(Debug, Args)]
/// Public struct `ScheduleArgs` used across Tidier components.
pub struct ScheduleArgs {
    #[arg(
        long = "cron",
        env = "TIDIER_SCHEDULE",
        default_value = DEFAULT_SCHEDULE,
        help = "Cron expression with a seconds field, evaluated in UTC"
    )]
    pub cron: String,

    #[arg(
        long = "max-runs",
        value_parser = parse_positive_usize,
        help = "Stop after this many runs instead of running forever"
    )]
    pub max_runs: Option<usize>,
}

/// Raw triage settings. Values stay strings here and are validated as a
/// whole by [`RawConfig::validate`].
#[derive(Debug, Args)]
pub struct TriageArgs {
    #[arg(
        long = "access-token",
        env = "TIDIER_ACCESS_TOKEN",
        hide_env_values = true,
        help = "GitHub token used for every API call"
    )]
    pub access_token: Option<String>,

    #[arg(
        long,
        env = "TIDIER_LABEL",
        help = "Label marking issues as candidates for closing [default: waiting on response]"
    )]
    pub label: Option<String>,

    #[arg(
        long = "include-repos",
        env = "TIDIER_INCLUDE_REPOS",
        help = "Regex a repository full name must match entirely [default: .*]"
    )]
    pub include_repos: Option<String>,

    #[arg(
        long = "exclude-repos",
        env = "TIDIER_EXCLUDE_REPOS",
        help = "Regex that excludes a repository when it matches the full name entirely"
    )]
    pub exclude_repos: Option<String>,

    #[arg(
        long = "num-days",
        env = "TIDIER_NUM_DAYS",
        allow_hyphen_values = true,
        help = "Days of inactivity before an open issue is closed [default: 90]"
    )]
    pub num_days: Option<String>,

    #[arg(
        long = "comment-format",
        env = "TIDIER_COMMENT_FORMAT",
        help = "Closing comment; {label} and {num_days} are substituted"
    )]
    pub comment_format: Option<String>,

    #[arg(
        long = "for-real",
        env = "TIDIER_FOR_REAL",
        help = "Perform mutations; '0', 'n', 'no' (any case) or empty keep the dry run"
    )]
    pub for_real: Option<String>,

    #[arg(
        long,
        env = "TIDIER_WEBHOOK",
        help = "URL requested with GET after every live run"
    )]
    pub webhook: Option<String>,

    #[arg(
        long = "close-strategy",
        env = "TIDIER_CLOSE_STRATEGY",
        help = "How issues are closed: 'graphql' (triage access) or 'rest' (write access) [default: graphql]"
    )]
    pub close_strategy: Option<String>,

    #[arg(
        long = "api-base",
        env = "TIDIER_API_BASE",
        default_value = DEFAULT_GITHUB_API_BASE,
        help = "Base URL of the GitHub REST API"
    )]
    pub api_base: String,

    #[arg(
        long = "graphql-url",
        env = "TIDIER_GRAPHQL_URL",
        default_value = DEFAULT_GITHUB_GRAPHQL_URL,
        help = "GitHub GraphQL endpoint"
    )]
    pub graphql_url: String,

    #[arg(
        long = "request-timeout-ms",
        env = "TIDIER_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Per-request HTTP timeout in milliseconds"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "TIDIER_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Attempts per GitHub request, including the first"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "TIDIER_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        help = "Initial backoff delay between retries in milliseconds"
    )]
    pub retry_base_delay_ms: u64,
}

impl TriageArgs {
    pub fn raw_config(&self) -> RawConfig {
        RawConfig {
            access_token: self.access_token.clone(),
            label: self.label.clone(),
            include_repos: self.include_repos.clone(),
            exclude_repos: self.exclude_repos.clone(),
            num_days: self.num_days.clone(),
            comment_format: self.comment_format.clone(),
            for_real: self.for_real.clone(),
            webhook: self.webhook.clone(),
            close_strategy: self.close_strategy.clone(),
        }
    }

    pub fn client_config(&self, token: &str) -> GithubClientConfig {
        GithubClientConfig {
            api_base: self.api_base.clone(),
            graphql_url: self.graphql_url.clone(),
            token: token.to_string(),
            request_timeout_ms: self.request_timeout_ms,
            retry_max_attempts: self.retry_max_attempts,
            retry_base_delay_ms: self.retry_base_delay_ms,
        }
    }
}
