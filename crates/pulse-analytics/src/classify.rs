//! Optional two-label message classification.
//!
//! The classifier backend is an external collaborator; the engine only
//! defines the trait seam and degrades to "not available" when no backend
//! is configured or the backend errors.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use pulse_core::clean_slack_formatting;

use crate::TaggedMessage;

/// Messages are classified at most this many per run to bound latency.
pub const CLASSIFY_MESSAGE_CAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistLabel {
    /// Help provided through the Slack thread itself.
    SlackAssist,
    /// Request to join a call or meeting.
    CallAssist,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationTally {
    pub slack_assist: usize,
    pub call_assist: usize,
}

#[async_trait]
/// Labels a single message text as one of the two assist categories.
pub trait MessageClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<AssistLabel>;
}

/// Classifies up to [`CLASSIFY_MESSAGE_CAP`] messages and tallies labels.
/// Returns `None` when no classifier is configured, the input is empty, or
/// the backend fails. Classification is additive and never blocks the
/// core metrics.
pub async fn classify_messages(
    classifier: Option<&dyn MessageClassifier>,
    messages: &[TaggedMessage],
    group_alias: &str,
) -> Option<ClassificationTally> {
    let classifier = classifier?;
    if messages.is_empty() {
        return None;
    }

    let mut tally = ClassificationTally::default();
    for message in messages.iter().take(CLASSIFY_MESSAGE_CAP) {
        let clean_text = clean_slack_formatting(&message.text, group_alias);
        match classifier.classify(&clean_text).await {
            Ok(AssistLabel::SlackAssist) => tally.slack_assist += 1,
            Ok(AssistLabel::CallAssist) => tally.call_assist += 1,
            Err(error) => {
                tracing::warn!(%error, "classifier unavailable, skipping classification");
                return None;
            }
        }
    }
    Some(tally)
}
