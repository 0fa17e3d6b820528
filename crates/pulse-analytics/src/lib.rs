//! Engagement analytics over a Slack channel's tagged message history.
//!
//! The pipeline: paginated ingestion of messages mentioning a team tag,
//! fiscal-quarter bucketing, per-thread response/resolution statistics, and
//! a leaderboard of contributors whose replies earned the verification
//! reaction. A TTL cache fronts the expensive fetches so repeated report
//! runs inside the validity window do not re-hit the Slack API.

mod cache;
mod classify;
mod ingest;
mod leaderboard;
mod report;
mod threads;


use chrono_tz::Tz;

pub use cache::ReportCache;
pub use classify::{
    classify_messages, AssistLabel, ClassificationTally, MessageClassifier, CLASSIFY_MESSAGE_CAP,
};
pub use ingest::{fetch_tagged_messages, FetchOutcome, TaggedMessage};
pub use leaderboard::score_contributors;
pub use report::{
    filter_by_quarter, filter_by_trailing_quarters, quarterly_volume, render_report_lines,
    requester_counts, unique_requesters, ReportEngine, TimeRange,
};
pub use threads::{collect_thread_stats, ThreadStats};

/// Tunable inputs for one analytics run. All values come from env/config,
/// never computed by the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub channel_id: String,
    /// The literal mention token Slack embeds for the team's user group,
    /// e.g. `<!subteam^S06TG9U38ET`. Matching is an exact substring check.
    pub tag_pattern: String,
    /// Friendly replacement for the tag when rendering message text.
    pub group_alias: String,
    pub timezone: Tz,
    /// Upper bound on messages scanned (not matched) during ingestion.
    pub max_scanned: usize,
    pub history_page_limit: usize,
    pub thread_reply_limit: usize,
    /// Concurrent in-flight reply fetches. 1 reproduces the strictly
    /// sequential reference behavior.
    pub reply_concurrency: usize,
    /// Reaction name marking a reply as a verified answer.
    pub resolution_reaction: String,
    pub message_cache_ttl_ms: u64,
    pub thread_cache_ttl_ms: u64,
    pub classification_cache_ttl_ms: u64,
}

impl EngineConfig {
    pub fn new(channel_id: impl Into<String>, group_id: &str, timezone: Tz) -> Self {
        Self {
            channel_id: channel_id.into(),
            tag_pattern: format!("<!subteam^{group_id}"),
            group_alias: "@team".to_string(),
            timezone,
            max_scanned: 1_000,
            history_page_limit: 200,
            thread_reply_limit: 1_000,
            reply_concurrency: 4,
            resolution_reaction: "white_check_mark".to_string(),
            message_cache_ttl_ms: 5 * 60 * 1_000,
            thread_cache_ttl_ms: 5 * 60 * 1_000,
            classification_cache_ttl_ms: 10 * 60 * 1_000,
        }
    }
}
