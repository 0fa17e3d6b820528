//! Command line surface for channel engagement reports.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pulse_analytics::{render_report_lines, EngineConfig, ReportEngine, TimeRange};
use pulse_slack::SlackApiClient;

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
    name = "pulse",
    about = "Engagement analytics over a Slack channel's tagged requests",
    version
)]
struct Cli {
    #[arg(
        long,
        env = "SLACK_BOT_TOKEN",
        hide_env_values = true,
        help = "Bot token with channels:history, groups:history, and users:read scopes"
    )]
    bot_token: String,

    #[arg(long, env = "SLACK_CHANNEL_ID", help = "Channel to analyze, e.g. C0123456789")]
    channel_id: String,

    #[arg(
        long,
        env = "PULSE_GROUP_ID",
        help = "User group id whose mentions mark a request, e.g. S06TG9U38ET"
    )]
    group_id: String,

    #[arg(
        long,
        env = "PULSE_GROUP_ALIAS",
        default_value = "@team",
        help = "Friendly replacement for the group mention in rendered text"
    )]
    group_alias: String,

    #[arg(
        long,
        env = "PULSE_TIMEZONE",
        default_value = "America/New_York",
        help = "IANA timezone used for fiscal-quarter bucketing"
    )]
    timezone: Tz,

    #[arg(
        long,
        env = "PULSE_TIME_RANGE",
        default_value = "trailing4",
        help = "Reporting window: `all`, `trailing<N>`, or a quarter label such as `FY25 Q3`"
    )]
    time_range: String,

    #[arg(
        long,
        env = "PULSE_MAX_SCANNED",
        default_value_t = 1_000,
        value_parser = parse_positive_usize,
        help = "Upper bound on history messages scanned per ingestion run"
    )]
    max_scanned: usize,

    #[arg(
        long,
        env = "PULSE_REPLY_CONCURRENCY",
        default_value_t = 4,
        value_parser = parse_positive_usize,
        help = "Concurrent in-flight thread reply fetches"
    )]
    reply_concurrency: usize,

    #[arg(
        long,
        env = "PULSE_RESOLUTION_REACTION",
        default_value = "white_check_mark",
        help = "Reaction name that marks a reply as a verified answer"
    )]
    resolution_reaction: String,

    #[arg(
        long,
        env = "SLACK_API_BASE",
        default_value = "https://slack.com/api",
        help = "Base URL for the Slack Web API"
    )]
    api_base: String,

    #[arg(
        long,
        env = "PULSE_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Per-request timeout in milliseconds"
    )]
    request_timeout_ms: u64,

    #[arg(
        long,
        env = "PULSE_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Maximum attempts per Slack API call"
    )]
    retry_max_attempts: usize,

    #[arg(
        long,
        env = "PULSE_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base backoff delay between retries in milliseconds"
    )]
    retry_base_delay_ms: u64,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let Some(time_range) = TimeRange::parse(&cli.time_range) else {
        bail!(
            "unrecognized time range {:?}; expected `all`, `trailing<N>`, or `FY<NN> Q<N>`",
            cli.time_range
        );
    };

    let mut config = EngineConfig::new(cli.channel_id, &cli.group_id, cli.timezone);
    config.group_alias = cli.group_alias;
    config.max_scanned = cli.max_scanned;
    config.reply_concurrency = cli.reply_concurrency;
    config.resolution_reaction = cli.resolution_reaction;

    let client = SlackApiClient::new(
        cli.api_base,
        cli.bot_token,
        cli.request_timeout_ms,
        cli.retry_max_attempts,
        cli.retry_base_delay_ms,
    )
    .context("failed to build slack api client")?;
    let engine = ReportEngine::new(Arc::new(client), config);

    let outcome = engine.tagged_messages().await?;
    tracing::debug!(
        matched = outcome.messages.len(),
        scanned = outcome.scanned,
        "ingestion complete"
    );

    let now = Utc::now().with_timezone(&engine.config().timezone);
    let filtered = time_range.filter(&outcome.messages, &now);
    let stats = engine.thread_stats(&filtered).await?;
    let leaderboard = engine.leaderboard(&filtered).await?;
    let classification = engine.classification(&filtered).await?;

    for line in render_report_lines(
        engine.config(),
        &time_range.label(),
        &outcome,
        &filtered,
        &stats,
        &leaderboard,
        classification.as_ref(),
    ) {
        println!("{line}");
    }
    Ok(())
}
