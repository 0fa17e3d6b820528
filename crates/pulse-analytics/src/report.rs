//! Report engine facade and fiscal-quarter reporting helpers.

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use anyhow::Result;
use chrono::Datelike;

use pulse_core::{
    fiscal_quarter_of, format_response_time, parse_quarter_label, quarter_over_quarter_change,
    trailing_quarters, FiscalQuarter,
};
use pulse_slack::ConversationSource;

use crate::{
    cache::ReportCache,
    classify::{classify_messages, ClassificationTally, MessageClassifier},
    ingest::{fetch_tagged_messages, FetchOutcome, TaggedMessage},
    leaderboard::score_contributors,
    threads::{collect_thread_stats, ThreadStats},
    EngineConfig,
};

/// The reporting window selected by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeRange {
    TrailingQuarters(usize),
    AllTime,
    Quarter { fiscal_year: i32, quarter: u8 },
}

impl TimeRange {
    /// Accepts `all`, `trailing<N>`, or a quarter label such as `FY25 Q3`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("all") || trimmed.eq_ignore_ascii_case("all-time") {
            return Some(Self::AllTime);
        }
        if let Some(rest) = trimmed.strip_prefix("trailing") {
            return match rest.parse::<usize>() {
                Ok(count) if count > 0 => Some(Self::TrailingQuarters(count)),
                _ => None,
            };
        }
        parse_quarter_label(trimmed).map(|(fiscal_year, quarter)| Self::Quarter {
            fiscal_year,
            quarter,
        })
    }

    pub fn label(&self) -> String {
        match self {
            Self::TrailingQuarters(count) => format!("trailing {count} quarters"),
            Self::AllTime => "all time".to_string(),
            Self::Quarter {
                fiscal_year,
                quarter,
            } => format!("FY{} Q{}", fiscal_year.rem_euclid(100), quarter),
        }
    }

    /// Restricts messages to this window, evaluated against `now`.
    pub fn filter(&self, messages: &[TaggedMessage], now: &impl Datelike) -> Vec<TaggedMessage> {
        match self {
            Self::AllTime => messages.to_vec(),
            Self::TrailingQuarters(count) => filter_by_trailing_quarters(messages, *count, now),
            Self::Quarter {
                fiscal_year,
                quarter,
            } => filter_by_quarter(messages, *fiscal_year, *quarter),
        }
    }
}

/// Keeps messages whose fiscal quarter falls in the last `n` quarters.
pub fn filter_by_trailing_quarters(
    messages: &[TaggedMessage],
    n: usize,
    now: &impl Datelike,
) -> Vec<TaggedMessage> {
    let valid: HashSet<(i32, u8)> = trailing_quarters(n, now).into_iter().collect();
    messages
        .iter()
        .filter(|message| {
            let quarter = fiscal_quarter_of(&message.timestamp);
            valid.contains(&(quarter.fiscal_year, quarter.quarter))
        })
        .cloned()
        .collect()
}

/// Keeps messages belonging to one specific fiscal quarter.
pub fn filter_by_quarter(
    messages: &[TaggedMessage],
    fiscal_year: i32,
    quarter: u8,
) -> Vec<TaggedMessage> {
    messages
        .iter()
        .filter(|message| {
            let bucket = fiscal_quarter_of(&message.timestamp);
            bucket.fiscal_year == fiscal_year && bucket.quarter == quarter
        })
        .cloned()
        .collect()
}

/// Message volume per fiscal quarter, most recent quarter first.
pub fn quarterly_volume(messages: &[TaggedMessage]) -> Vec<(FiscalQuarter, usize)> {
    let mut counts: HashMap<FiscalQuarter, usize> = HashMap::new();
    for message in messages {
        *counts.entry(fiscal_quarter_of(&message.timestamp)).or_insert(0) += 1;
    }
    let mut volume: Vec<(FiscalQuarter, usize)> = counts.into_iter().collect();
    volume.sort_by_key(|(quarter, _)| std::cmp::Reverse(quarter.ordinal()));
    volume
}

/// Requests per requester display name, descending; ties keep discovery
/// order.
pub fn requester_counts(messages: &[TaggedMessage]) -> Vec<(String, usize)> {
    let mut discovery_order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for message in messages {
        if !counts.contains_key(&message.user_name) {
            discovery_order.push(message.user_name.clone());
        }
        *counts.entry(message.user_name.clone()).or_insert(0) += 1;
    }
    let mut rows: Vec<(String, usize)> = discovery_order
        .into_iter()
        .map(|name| {
            let count = counts.get(&name).copied().unwrap_or(0);
            (name, count)
        })
        .collect();
    rows.sort_by(|left, right| right.1.cmp(&left.1));
    rows
}

pub fn unique_requesters(messages: &[TaggedMessage]) -> usize {
    messages
        .iter()
        .map(|message| message.user_name.as_str())
        .collect::<HashSet<_>>()
        .len()
}

fn message_fingerprint(messages: &[TaggedMessage]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for message in messages {
        message.ts.hash(&mut hasher);
    }
    hasher.finish()
}

/// Front door for report queries. Wires ingestion, thread statistics,
/// leaderboard scoring, and classification through the TTL cache so that
/// repeated queries inside the validity window reuse upstream results.
pub struct ReportEngine {
    source: Arc<dyn ConversationSource>,
    classifier: Option<Arc<dyn MessageClassifier>>,
    cache: Arc<ReportCache>,
    config: EngineConfig,
}

impl ReportEngine {
    pub fn new(source: Arc<dyn ConversationSource>, config: EngineConfig) -> Self {
        Self {
            source,
            classifier: None,
            cache: Arc::new(ReportCache::new()),
            config,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn MessageClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_cache(mut self, cache: Arc<ReportCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Cached tag-filtered ingestion over channel history.
    pub async fn tagged_messages(&self) -> Result<FetchOutcome> {
        let key = format!(
            "tagged-messages:{}:{}:{}",
            self.config.channel_id, self.config.tag_pattern, self.config.max_scanned
        );
        self.cache
            .get_or_compute(&key, self.config.message_cache_ttl_ms, || async {
                Ok(fetch_tagged_messages(self.source.as_ref(), &self.config).await)
            })
            .await
    }

    /// Cached per-thread statistics for the given message set.
    pub async fn thread_stats(&self, messages: &[TaggedMessage]) -> Result<ThreadStats> {
        let key = format!(
            "thread-stats:{}:{:016x}",
            self.config.channel_id,
            message_fingerprint(messages)
        );
        self.cache
            .get_or_compute(&key, self.config.thread_cache_ttl_ms, || async {
                Ok(collect_thread_stats(self.source.as_ref(), &self.config, messages).await)
            })
            .await
    }

    /// Cached leaderboard for the given message set.
    pub async fn leaderboard(&self, messages: &[TaggedMessage]) -> Result<Vec<(String, u64)>> {
        let key = format!(
            "leaderboard:{}:{:016x}",
            self.config.channel_id,
            message_fingerprint(messages)
        );
        self.cache
            .get_or_compute(&key, self.config.thread_cache_ttl_ms, || async {
                Ok(score_contributors(self.source.as_ref(), &self.config, messages).await)
            })
            .await
    }

    /// Cached classification tally; `None` when the collaborator is not
    /// configured or unavailable.
    pub async fn classification(
        &self,
        messages: &[TaggedMessage],
    ) -> Result<Option<ClassificationTally>> {
        let key = format!(
            "classification:{}:{:016x}",
            self.config.channel_id,
            message_fingerprint(messages)
        );
        self.cache
            .get_or_compute(&key, self.config.classification_cache_ttl_ms, || async {
                Ok(classify_messages(
                    self.classifier.as_deref(),
                    messages,
                    &self.config.group_alias,
                )
                .await)
            })
            .await
    }

    /// Manual refresh: drops every cached value so the next query re-hits
    /// the upstream API.
    pub fn refresh(&self) {
        self.cache.clear();
    }
}

/// Renders the executive summary as plain text lines for the CLI surface.
pub fn render_report_lines(
    config: &EngineConfig,
    time_range_label: &str,
    outcome: &FetchOutcome,
    filtered: &[TaggedMessage],
    stats: &ThreadStats,
    leaderboard: &[(String, u64)],
    classification: Option<&ClassificationTally>,
) -> Vec<String> {
    let mut lines = vec![format!(
        "pulse report for channel {}: {}",
        config.channel_id, time_range_label
    )];
    lines.push(format!("total_requests: {}", filtered.len()));
    lines.push(format!("unique_requesters: {}", unique_requesters(filtered)));
    lines.push(format!(
        "response_rate: {:.1}%",
        stats.response_rate_percent()
    ));
    lines.push(format!(
        "resolution_rate: {:.1}%",
        stats.resolution_rate_percent()
    ));
    lines.push(format!(
        "avg_response_time: {}",
        stats
            .average_response_minutes()
            .map(format_response_time)
            .unwrap_or_else(|| "none".to_string())
    ));
    lines.push(format!(
        "median_response_time: {}",
        stats
            .median_response_minutes()
            .map(format_response_time)
            .unwrap_or_else(|| "none".to_string())
    ));
    lines.push(format!("active_responders: {}", stats.responders.len()));

    if let Some(tally) = classification {
        lines.push(format!("slack_assist: {}", tally.slack_assist));
        lines.push(format!("call_assist: {}", tally.call_assist));
    } else {
        lines.push("classification: not available".to_string());
    }

    let volume = quarterly_volume(outcome.messages.as_slice());
    if !volume.is_empty() {
        lines.push("quarterly_volume:".to_string());
        for (index, (quarter, count)) in volume.iter().enumerate() {
            let delta = volume
                .get(index + 1)
                .and_then(|(_, prior)| quarter_over_quarter_change(*count, *prior))
                .map(|change| format!(" ({change:+.0}% vs prior)"))
                .unwrap_or_default();
            lines.push(format!("- {}: {}{}", quarter.label, count, delta));
        }
    }

    if leaderboard.is_empty() {
        lines.push("top_performers: none".to_string());
    } else {
        lines.push("top_performers:".to_string());
        for (name, score) in leaderboard.iter().take(10) {
            lines.push(format!("- {name}: {score}"));
        }
    }

    for warning in &outcome.warnings {
        lines.push(format!("warning: {warning}"));
    }

    lines
}
