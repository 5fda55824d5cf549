//! Model endpoint client
//!
//! The opaque `complete(messages) -> text` collaborator behind a trait, so
//! the orchestrator can run against the HTTP endpoint, or a mock when no
//! endpoint is available. Uses a long-lived reqwest::Client for connection
//! pooling; any non-2xx status or malformed body is a transport failure.

use crate::error::AdvisorError;
use crate::prompt::PromptMessage;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Trait for the model completion collaborator
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    messages: &'a [PromptMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    response: String,
}

/// HTTP client for the model endpoint (connection-pooled)
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
}

impl HttpCompletionClient {
    /// The endpoint has no timeout contract of its own; cap requests so a
    /// hung call cannot hold the session busy forever.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(endpoint: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, endpoint }
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String> {
        info!(message_count = messages.len(), "Calling model endpoint");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&CompletionRequest { messages })
            .send()
            .await
            .map_err(|e| {
                error!("Model endpoint request failed: {}", e);
                AdvisorError::Completion(format!("request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Model endpoint error response: {}", body);
            return Err(AdvisorError::Completion(format!(
                "endpoint returned {}",
                status
            )));
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            error!("Failed to parse model response: {}", e);
            AdvisorError::Completion(format!("malformed response: {}", e))
        })?;

        info!(
            response_len = completion.response.len(),
            "Model response received"
        );

        Ok(completion.response)
    }
}

/// Mock client for development & testing.
/// Keeps the system functional without a model endpoint.
pub struct MockCompletionClient {
    reply: String,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self {
            reply: "Your allocation looks broadly sensible for your profile. \
                    ⬆️ Move NT$100,000 from RR1 to RR3 to pick up some balanced growth."
                .to_string(),
        }
    }

    /// A mock that always answers with the given text
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl Default for MockCompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, _messages: &[PromptMessage]) -> Result<String> {
        Ok(self.reply.clone())
    }
}

/// A client that always fails; used to exercise transport-error paths
#[cfg(test)]
pub struct FailingCompletionClient;

#[cfg(test)]
#[async_trait]
impl CompletionClient for FailingCompletionClient {
    async fn complete(&self, _messages: &[PromptMessage]) -> Result<String> {
        Err(AdvisorError::Completion("endpoint unreachable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PromptMessage;

    #[test]
    fn test_request_serialization() {
        let messages = vec![
            PromptMessage::system("You are a financial advisor"),
            PromptMessage::user("What should I change?"),
        ];
        let request = CompletionRequest {
            messages: &messages,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"role\":\"system\""));
        assert!(json.contains("What should I change?"));
    }

    #[test]
    fn test_response_deserialization() {
        let body = r#"{"response": "Move NT$100,000 from RR1 to RR3"}"#;
        let parsed: CompletionResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.response.contains("RR1"));
    }

    #[test]
    fn test_unexpected_shape_is_rejected() {
        let body = r#"{"answer": "wrong field"}"#;
        assert!(serde_json::from_str::<CompletionResponse>(body).is_err());
    }

    #[tokio::test]
    async fn test_mock_client_replies() {
        let client = MockCompletionClient::with_reply("hello");
        let reply = client.complete(&[]).await.unwrap();
        assert_eq!(reply, "hello");
    }
}
