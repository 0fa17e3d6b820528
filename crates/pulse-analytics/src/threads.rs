//! Per-thread engagement statistics over tagged parent messages.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};

use pulse_slack::{ConversationSource, MessagePayload};

use crate::{ingest::resolve_user_name, EngineConfig, TaggedMessage};

/// Aggregate thread metrics for one query run. Rebuilt on every call;
/// only the result cache gives it a longer lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadStats {
    pub total_threads: usize,
    pub threads_with_replies: usize,
    pub threads_with_resolution: usize,
    /// First-response latencies in minutes, in input-thread order. Only
    /// strictly positive deltas are recorded.
    pub response_times_minutes: Vec<f64>,
    pub responders: BTreeSet<String>,
    pub active_responders: BTreeMap<String, usize>,
}

impl ThreadStats {
    pub fn response_rate_percent(&self) -> f64 {
        if self.total_threads == 0 {
            return 0.0;
        }
        self.threads_with_replies as f64 / self.total_threads as f64 * 100.0
    }

    pub fn resolution_rate_percent(&self) -> f64 {
        if self.total_threads == 0 {
            return 0.0;
        }
        self.threads_with_resolution as f64 / self.total_threads as f64 * 100.0
    }

    pub fn average_response_minutes(&self) -> Option<f64> {
        if self.response_times_minutes.is_empty() {
            return None;
        }
        let total: f64 = self.response_times_minutes.iter().sum();
        Some(total / self.response_times_minutes.len() as f64)
    }

    pub fn median_response_minutes(&self) -> Option<f64> {
        if self.response_times_minutes.is_empty() {
            return None;
        }
        let mut sorted = self.response_times_minutes.clone();
        sorted.sort_by(|left, right| left.total_cmp(right));
        Some(sorted[sorted.len() / 2])
    }
}

/// Fetches each thread's raw reply list, one fetch per parent, with bounded
/// concurrency. Results align with the input order regardless of completion
/// order; a failed fetch yields `None` for that slot so the caller can skip
/// the thread without aborting the pass.
pub(crate) async fn collect_thread_replies(
    source: &dyn ConversationSource,
    config: &EngineConfig,
    thread_roots: &[&str],
) -> Vec<Option<Vec<MessagePayload>>> {
    stream::iter(thread_roots.iter().copied())
        .map(|thread_ts| async move {
            match source
                .thread_replies(&config.channel_id, thread_ts, config.thread_reply_limit)
                .await
            {
                Ok(replies) => Some(replies),
                Err(error) => {
                    tracing::debug!(thread_ts, %error, "skipping unreachable thread");
                    None
                }
            }
        })
        .buffered(config.reply_concurrency.max(1))
        .collect()
        .await
}

/// Folds reply lists for every tagged parent message into [`ThreadStats`].
///
/// The first entry of each raw reply list is the parent itself and is
/// excluded from reply tallies. Resolution is counted at most once per
/// thread no matter how many replies carry the marker reaction.
pub async fn collect_thread_stats(
    source: &dyn ConversationSource,
    config: &EngineConfig,
    messages: &[TaggedMessage],
) -> ThreadStats {
    let mut stats = ThreadStats {
        total_threads: messages.len(),
        ..ThreadStats::default()
    };
    let roots: Vec<&str> = messages.iter().map(|message| message.ts.as_str()).collect();
    let reply_lists = collect_thread_replies(source, config, &roots).await;
    let mut name_memo: HashMap<String, String> = HashMap::new();

    for (message, reply_list) in messages.iter().zip(reply_lists) {
        let Some(raw_replies) = reply_list else {
            continue;
        };
        let replies = raw_replies.get(1..).unwrap_or(&[]);
        if replies.is_empty() {
            continue;
        }
        stats.threads_with_replies += 1;

        if let (Some(parent_seconds), Some(first_reply_seconds)) = (
            message.ts.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            replies[0].ts_seconds(),
        ) {
            let latency_minutes = (first_reply_seconds - parent_seconds) / 60.0;
            if latency_minutes > 0.0 {
                stats.response_times_minutes.push(latency_minutes);
            }
        }

        if replies
            .iter()
            .any(|reply| reply.has_reaction(&config.resolution_reaction))
        {
            stats.threads_with_resolution += 1;
        }

        for reply in replies {
            let Some(user_id) = reply.user.as_deref() else {
                continue;
            };
            let responder = resolve_user_name(source, &mut name_memo, user_id).await;
            stats.responders.insert(responder.clone());
            *stats.active_responders.entry(responder).or_insert(0) += 1;
        }
    }

    stats
}
