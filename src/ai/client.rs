use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CompletionConfig;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("AI response failed: max retries exceeded after {attempts} attempts (last status {status}: {body})")]
    RetriesExhausted {
        attempts: u32,
        status: u16,
        body: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("response contained no candidate text")]
    EmptyResponse,
}

impl CompletionError {
    /// Rate limiting, server errors and transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            Self::Transport(_) => true,
            _ => false,
        }
    }

    fn exhausted(self, attempts: u32) -> Self {
        match self {
            Self::Status { status, body } => Self::RetriesExhausted {
                attempts,
                status,
                body,
            },
            other => other,
        }
    }
}

/// A generative-text endpoint: one prompt in, one text blob out.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    /// Wait before the attempt following `failed_attempt` (0-based): base * 2^n.
    pub fn delay(&self, failed_attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(failed_attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.is_empty())
    }
}

/// Gemini `generateContent` client with bounded retries.
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    policy: RetryPolicy,
}

impl GeminiClient {
    pub fn new(config: &CompletionConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        if config.api_key.is_none() {
            tracing::warn!("Completion API key not configured, requests will likely be rejected");
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            policy: RetryPolicy {
                max_attempts: config.max_attempts.max(1),
                base_backoff: Duration::from_millis(config.base_backoff_ms),
            },
        })
    }

    async fn send_once(&self, request: &GenerateRequest) -> Result<String, CompletionError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.query(&[("key", key)]);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| CompletionError::Malformed(e.to_string()))?;
        parsed.into_text().ok_or(CompletionError::EmptyResponse)
    }
}

#[async_trait]
impl TextCompletion for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        let mut attempt = 0;
        loop {
            match self.send_once(&request).await {
                Ok(text) => return Ok(text),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.policy.max_attempts {
                        return Err(e.exhausted(attempt));
                    }
                    let delay = self.policy.delay(attempt - 1);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying completion request"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(&CompletionConfig {
            endpoint: format!("{}/v1beta/models/test:generateContent", server.uri()),
            api_key: Some("test-key".to_string()),
            max_attempts: 3,
            base_backoff_ms: 5,
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn ok_body(text: &str) -> serde_json::Value {
        json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] })
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
    }

    #[test]
    fn retryable_classification() {
        let status = |status| CompletionError::Status {
            status,
            body: String::new(),
        };
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(403).is_retryable());
        assert!(!CompletionError::EmptyResponse.is_retryable());
    }

    #[tokio::test]
    async fn sends_prompt_and_reads_first_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("world")))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server).complete("hello").await.unwrap();
        assert_eq!(text, "world");
    }

    #[tokio::test]
    async fn client_error_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).complete("hello").await.unwrap_err();
        assert!(matches!(err, CompletionError::Status { status: 400, .. }));
        assert!(err.to_string().contains("bad request"));
    }

    #[tokio::test]
    async fn server_errors_exhaust_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server).complete("hello").await.unwrap_err();
        assert!(matches!(
            err,
            CompletionError::RetriesExhausted {
                attempts: 3,
                status: 503,
                ..
            }
        ));
        assert!(err.to_string().contains("max retries exceeded"));
    }

    #[tokio::test]
    async fn success_without_text_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).complete("hello").await.unwrap_err();
        assert!(matches!(err, CompletionError::EmptyResponse));
    }

    #[tokio::test]
    async fn transport_error_is_returned_after_last_attempt() {
        let config = CompletionConfig {
            // Nothing listens on the discard port.
            endpoint: "http://127.0.0.1:9/generate".to_string(),
            api_key: None,
            max_attempts: 2,
            base_backoff_ms: 1,
            timeout_secs: 2,
        };
        let err = GeminiClient::new(&config)
            .unwrap()
            .complete("hello")
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
    }
}
