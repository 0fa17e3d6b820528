//! Contributor leaderboard scored from verified-answer reactions.

use std::collections::HashMap;

use pulse_slack::ConversationSource;

use crate::{ingest::resolve_user_name, threads::collect_thread_replies, EngineConfig, TaggedMessage};

/// Tallies one point per marker-bearing reply to its author across all
/// input threads. Unlike thread resolution, which counts once per thread,
/// every marked reply scores here, so two verified answers in the same
/// thread are two points. Output is ordered by score descending; ties keep the
/// order authors were first encountered in.
///
/// Threads whose reply fetch fails are skipped silently, matching the
/// thread-stats pass.
pub async fn score_contributors(
    source: &dyn ConversationSource,
    config: &EngineConfig,
    messages: &[TaggedMessage],
) -> Vec<(String, u64)> {
    let roots: Vec<&str> = messages.iter().map(|message| message.ts.as_str()).collect();
    let reply_lists = collect_thread_replies(source, config, &roots).await;

    let mut name_memo: HashMap<String, String> = HashMap::new();
    let mut discovery_order: Vec<String> = Vec::new();
    let mut scores: HashMap<String, u64> = HashMap::new();

    for reply_list in reply_lists {
        let Some(raw_replies) = reply_list else {
            continue;
        };
        for reply in raw_replies.get(1..).unwrap_or(&[]) {
            let Some(user_id) = reply.user.as_deref() else {
                continue;
            };
            if !reply.has_reaction(&config.resolution_reaction) {
                continue;
            }
            let name = resolve_user_name(source, &mut name_memo, user_id).await;
            if !scores.contains_key(&name) {
                discovery_order.push(name.clone());
            }
            *scores.entry(name).or_insert(0) += 1;
        }
    }

    let mut leaderboard: Vec<(String, u64)> = discovery_order
        .into_iter()
        .map(|name| {
            let score = scores.get(&name).copied().unwrap_or(0);
            (name, score)
        })
        .collect();
    // Stable sort keeps discovery order for equal scores.
    leaderboard.sort_by(|left, right| right.1.cmp(&left.1));
    leaderboard
}
