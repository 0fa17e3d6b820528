//! Slack Web API client used by ingestion and thread aggregation.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::helpers::{
    is_retryable_slack_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};
use crate::types::{HistoryPage, MessagePayload};
use crate::{ConversationSource, SlackApiError};

#[derive(Debug, Clone, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct HistoryResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<MessagePayload>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RepliesResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<MessagePayload>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct UserPayload {
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct UsersInfoResponse {
    ok: bool,
    #[serde(default)]
    user: Option<UserPayload>,
    #[serde(default)]
    error: Option<String>,
}

/// Thin client over the Slack Web API read endpoints, with bounded retry on
/// rate limits and transient transport failures.
#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl SlackApiClient {
    pub fn new(
        api_base: String,
        bot_token: String,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self, SlackApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("pulse-analytics"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.trim().to_string(),
            retry_max_attempts: retry_max_attempts.max(1),
            retry_base_delay_ms: retry_base_delay_ms.max(1),
        })
    }

    async fn request_json<T, F>(
        &self,
        operation: &'static str,
        mut builder: F,
    ) -> Result<T, SlackApiError>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder()
                .header("x-pulse-retry-attempt", attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<T>().await.map_err(|error| {
                            SlackApiError::Decode {
                                operation,
                                message: error.to_string(),
                            }
                        });
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && is_retryable_slack_status(status.as_u16())
                    {
                        tracing::debug!(
                            operation,
                            status = status.as_u16(),
                            attempt,
                            "retrying slack api call"
                        );
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    return Err(SlackApiError::HttpStatus {
                        operation,
                        status: status.as_u16(),
                        body: truncate_for_error(&body, 800),
                    });
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(SlackApiError::Http(error));
                }
            }
        }
    }
}

#[async_trait]
impl ConversationSource for SlackApiClient {
    async fn channel_history(
        &self,
        channel: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<HistoryPage, SlackApiError> {
        let mut params = vec![
            ("channel".to_string(), channel.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor".to_string(), cursor.to_string()));
        }

        let response: HistoryResponse = self
            .request_json("conversations.history", || {
                self.http
                    .get(format!("{}/conversations.history", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .query(&params)
            })
            .await?;

        if !response.ok {
            return Err(SlackApiError::Api {
                operation: "conversations.history",
                message: response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        Ok(HistoryPage {
            messages: response.messages,
            has_more: response.has_more,
            next_cursor: response
                .response_metadata
                .and_then(|metadata| metadata.next_cursor),
        })
    }

    async fn thread_replies(
        &self,
        channel: &str,
        thread_ts: &str,
        limit: usize,
    ) -> Result<Vec<MessagePayload>, SlackApiError> {
        let params = vec![
            ("channel".to_string(), channel.to_string()),
            ("ts".to_string(), thread_ts.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];

        let response: RepliesResponse = self
            .request_json("conversations.replies", || {
                self.http
                    .get(format!("{}/conversations.replies", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .query(&params)
            })
            .await?;

        if !response.ok {
            return Err(SlackApiError::Api {
                operation: "conversations.replies",
                message: response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        Ok(response.messages)
    }

    async fn user_display_name(&self, user_id: &str) -> Result<String, SlackApiError> {
        let params = vec![("user".to_string(), user_id.to_string())];
        let response: UsersInfoResponse = self
            .request_json("users.info", || {
                self.http
                    .get(format!("{}/users.info", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .query(&params)
            })
            .await?;

        if !response.ok {
            return Err(SlackApiError::Api {
                operation: "users.info",
                message: response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        let user = response.user.unwrap_or(UserPayload {
            real_name: None,
            name: None,
        });
        Ok(user
            .real_name
            .filter(|name| !name.trim().is_empty())
            .or(user.name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use crate::{ConversationSource, SlackApiClient, SlackApiError};

    fn test_client(base_url: &str) -> SlackApiClient {
        SlackApiClient::new(base_url.to_string(), "xoxb-test".to_string(), 2_000, 3, 1)
            .expect("client")
    }

    #[tokio::test]
    async fn integration_channel_history_decodes_messages_and_cursor() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/conversations.history")
                .query_param("channel", "C1")
                .query_param("limit", "200");
            then.status(200).json_body(json!({
                "ok": true,
                "messages": [
                    {"ts": "100.1", "user": "U1", "text": "hello <!subteam^S1>"},
                    {"ts": "99.1", "text": "bot line without user"}
                ],
                "has_more": true,
                "response_metadata": {"next_cursor": "cursor-2"}
            }));
        });

        let page = test_client(&server.base_url())
            .channel_history("C1", None, 200)
            .await
            .expect("history page");
        assert_eq!(page.messages.len(), 2);
        assert_eq!(page.messages[0].ts, "100.1");
        assert_eq!(page.messages[1].user, None);
        assert_eq!(page.continuation_cursor(), Some("cursor-2"));
    }

    #[tokio::test]
    async fn integration_channel_history_passes_cursor_on_follow_up_pages() {
        let server = MockServer::start();
        let paged = server.mock(|when, then| {
            when.method(GET)
                .path("/conversations.history")
                .query_param("cursor", "cursor-2");
            then.status(200).json_body(json!({
                "ok": true,
                "messages": [],
                "has_more": false
            }));
        });

        let page = test_client(&server.base_url())
            .channel_history("C1", Some("cursor-2"), 200)
            .await
            .expect("history page");
        paged.assert();
        assert_eq!(page.continuation_cursor(), None);
    }

    #[tokio::test]
    async fn integration_client_retries_rate_limits_before_succeeding() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/conversations.replies")
                .header("x-pulse-retry-attempt", "0");
            then.status(429)
                .header("retry-after", "0")
                .body("rate limit");
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/conversations.replies")
                .header("x-pulse-retry-attempt", "1");
            then.status(200).json_body(json!({
                "ok": true,
                "messages": [{"ts": "1.0", "user": "U1", "text": "parent"}]
            }));
        });

        let replies = test_client(&server.base_url())
            .thread_replies("C1", "1.0", 1_000)
            .await
            .expect("replies after retry");
        assert_eq!(replies.len(), 1);
    }

    #[tokio::test]
    async fn integration_ok_false_surfaces_slack_error_string() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/conversations.history");
            then.status(200)
                .json_body(json!({"ok": false, "error": "channel_not_found"}));
        });

        let error = test_client(&server.base_url())
            .channel_history("C-missing", None, 200)
            .await
            .expect_err("expected api error");
        match error {
            SlackApiError::Api { operation, message } => {
                assert_eq!(operation, "conversations.history");
                assert_eq!(message, "channel_not_found");
            }
            other => panic!("unexpected error variant: {other}"),
        }
    }

    #[tokio::test]
    async fn integration_user_display_name_prefers_real_name_then_name() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/users.info").query_param("user", "U1");
            then.status(200).json_body(json!({
                "ok": true,
                "user": {"real_name": "Hannah Smith", "name": "hannah"}
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/users.info").query_param("user", "U2");
            then.status(200)
                .json_body(json!({"ok": true, "user": {"name": "bolek"}}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/users.info").query_param("user", "U3");
            then.status(200).json_body(json!({"ok": true, "user": {}}));
        });

        let client = test_client(&server.base_url());
        assert_eq!(client.user_display_name("U1").await.unwrap(), "Hannah Smith");
        assert_eq!(client.user_display_name("U2").await.unwrap(), "bolek");
        assert_eq!(client.user_display_name("U3").await.unwrap(), "Unknown");
    }

    #[tokio::test]
    async fn regression_non_retryable_status_fails_without_retry() {
        let server = MockServer::start();
        let denied = server.mock(|when, then| {
            when.method(GET).path("/users.info");
            then.status(403).body("forbidden");
        });

        let error = test_client(&server.base_url())
            .user_display_name("U1")
            .await
            .expect_err("expected status error");
        denied.assert_calls(1);
        match error {
            SlackApiError::HttpStatus { status, .. } => assert_eq!(status, 403),
            other => panic!("unexpected error variant: {other}"),
        }
    }
}
