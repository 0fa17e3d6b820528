//! Payload shapes shared between the API client and the analytics crates.

use serde::{Deserialize, Serialize};

/// A reaction applied to a message, as Slack reports it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReactionPayload {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub users: Vec<String>,
}

/// A raw channel or thread message. Bot messages carry no `user`; malformed
/// records may miss `ts` entirely, which downstream tallies treat as
/// excluded rather than fatal.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub reactions: Vec<ReactionPayload>,
}

impl MessagePayload {
    /// Parses the `ts` token (`"1724112000.000100"`) into epoch seconds.
    pub fn ts_seconds(&self) -> Option<f64> {
        self.ts
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
    }

    /// True when any reaction on this message carries the given name.
    pub fn has_reaction(&self, name: &str) -> bool {
        self.reactions.iter().any(|reaction| reaction.name == name)
    }
}

/// One page of channel history plus its continuation state.
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub messages: Vec<MessagePayload>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

impl HistoryPage {
    /// A page terminates pagination when Slack reports no follow-up page.
    pub fn continuation_cursor(&self) -> Option<&str> {
        if !self.has_more {
            return None;
        }
        self.next_cursor
            .as_deref()
            .map(str::trim)
            .filter(|cursor| !cursor.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::{HistoryPage, MessagePayload, ReactionPayload};

    #[test]
    fn unit_ts_seconds_parses_slack_timestamps_and_rejects_garbage() {
        let mut payload = MessagePayload {
            ts: "1724112000.000100".to_string(),
            ..MessagePayload::default()
        };
        assert!((payload.ts_seconds().unwrap() - 1_724_112_000.0001).abs() < 1e-3);

        payload.ts = "not-a-ts".to_string();
        assert_eq!(payload.ts_seconds(), None);

        payload.ts = String::new();
        assert_eq!(payload.ts_seconds(), None);
    }

    #[test]
    fn unit_has_reaction_matches_exact_names_only() {
        let payload = MessagePayload {
            reactions: vec![ReactionPayload {
                name: "white_check_mark".to_string(),
                count: 2,
                users: vec!["U1".to_string(), "U2".to_string()],
            }],
            ..MessagePayload::default()
        };
        assert!(payload.has_reaction("white_check_mark"));
        assert!(!payload.has_reaction("white_check"));
    }

    #[test]
    fn unit_continuation_cursor_requires_has_more_and_non_empty_cursor() {
        let mut page = HistoryPage {
            messages: Vec::new(),
            has_more: true,
            next_cursor: Some("abc".to_string()),
        };
        assert_eq!(page.continuation_cursor(), Some("abc"));

        page.has_more = false;
        assert_eq!(page.continuation_cursor(), None);

        page.has_more = true;
        page.next_cursor = Some("   ".to_string());
        assert_eq!(page.continuation_cursor(), None);

        page.next_cursor = None;
        assert_eq!(page.continuation_cursor(), None);
    }
}
