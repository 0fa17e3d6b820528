//! Paginated ingestion of tag-mentioning messages from channel history.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use pulse_slack::ConversationSource;

use crate::EngineConfig;

/// A channel message that mentions the target tag, normalized for
/// reporting. `ts` doubles as the thread-root token for reply lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedMessage {
    pub ts: String,
    pub timestamp: DateTime<FixedOffset>,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
}

/// Outcome of one ingestion run. `warnings` is non-empty when the fetch
/// terminated early on an API error and the message list is partial.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub messages: Vec<TaggedMessage>,
    pub scanned: usize,
    pub warnings: Vec<String>,
}

impl FetchOutcome {
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

pub(crate) async fn resolve_user_name(
    source: &dyn ConversationSource,
    memo: &mut HashMap<String, String>,
    user_id: &str,
) -> String {
    if let Some(name) = memo.get(user_id) {
        return name.clone();
    }
    let name = match source.user_display_name(user_id).await {
        Ok(name) => name,
        Err(error) => {
            tracing::debug!(user_id, %error, "user lookup failed, using sentinel name");
            "Unknown".to_string()
        }
    };
    memo.insert(user_id.to_string(), name.clone());
    name
}

/// Pages through channel history and keeps messages whose text contains the
/// configured tag pattern. Scans at most `max_scanned` messages (matched or
/// not) and stops early when the API reports no further pages. Transport
/// errors terminate the walk and return the partial accumulation with a
/// warning; they never abort the caller.
pub async fn fetch_tagged_messages(
    source: &dyn ConversationSource,
    config: &EngineConfig,
) -> FetchOutcome {
    let mut outcome = FetchOutcome::default();
    let mut cursor: Option<String> = None;
    let mut name_memo: HashMap<String, String> = HashMap::new();

    while outcome.scanned < config.max_scanned {
        let page_limit = config
            .history_page_limit
            .min(config.max_scanned - outcome.scanned)
            .max(1);
        let page = match source
            .channel_history(&config.channel_id, cursor.as_deref(), page_limit)
            .await
        {
            Ok(page) => page,
            Err(error) => {
                tracing::warn!(
                    channel = %config.channel_id,
                    scanned = outcome.scanned,
                    %error,
                    "history fetch aborted, returning partial results"
                );
                outcome
                    .warnings
                    .push(format!("history fetch aborted: {error}"));
                break;
            }
        };

        for raw in &page.messages {
            outcome.scanned += 1;
            let (Some(user_id), Some(text)) = (raw.user.as_deref(), raw.text.as_deref()) else {
                continue;
            };
            if !text.contains(&config.tag_pattern) {
                continue;
            }
            let Some(seconds) = raw.ts_seconds() else {
                tracing::debug!(ts = %raw.ts, "skipping tagged message with malformed ts");
                continue;
            };
            let Some(instant) = DateTime::from_timestamp_millis((seconds * 1_000.0) as i64) else {
                tracing::debug!(ts = %raw.ts, "skipping tagged message outside timestamp range");
                continue;
            };
            let user_name = resolve_user_name(source, &mut name_memo, user_id).await;
            outcome.messages.push(TaggedMessage {
                ts: raw.ts.clone(),
                timestamp: instant.with_timezone(&config.timezone).fixed_offset(),
                user_id: user_id.to_string(),
                user_name,
                text: text.to_string(),
            });
        }

        cursor = page.continuation_cursor().map(ToOwned::to_owned);
        if cursor.is_none() {
            break;
        }
    }

    tracing::debug!(
        channel = %config.channel_id,
        scanned = outcome.scanned,
        matched = outcome.messages.len(),
        partial = outcome.is_partial(),
        "ingestion pass complete"
    );
    outcome
}
