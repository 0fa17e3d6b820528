//! Slack Web API client for the pulse analytics engine.
//!
//! Exposes the three read endpoints the engine consumes (paginated channel
//! history, thread replies, and user identity lookup) behind the
//! [`ConversationSource`] trait so aggregation code can run against test
//! doubles or a future batched implementation.

mod api_client;
mod helpers;
mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use api_client::SlackApiClient;
pub use types::{HistoryPage, MessagePayload, ReactionPayload};

/// Errors surfaced by Slack Web API calls.
#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("slack api {operation} failed with status {status}: {body}")]
    HttpStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("slack api {operation} returned error: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },
    #[error("failed to decode slack {operation} response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

#[async_trait]
/// Read-only view over a Slack conversation: history pages, thread replies,
/// and display-name lookups.
pub trait ConversationSource: Send + Sync {
    /// Fetches one page of channel history, newest first, continuing from
    /// `cursor` when present. `limit` bounds the page size.
    async fn channel_history(
        &self,
        channel: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<HistoryPage, SlackApiError>;

    /// Fetches the raw reply list for a thread. The first entry is the
    /// parent message itself.
    async fn thread_replies(
        &self,
        channel: &str,
        thread_ts: &str,
        limit: usize,
    ) -> Result<Vec<MessagePayload>, SlackApiError>;

    /// Resolves a user id to a display name.
    async fn user_display_name(&self, user_id: &str) -> Result<String, SlackApiError>;
}
