use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;

use crate::{
    client::LlmClient,
    error::LlmError,
    grok::types::{ChatMessage, ChatRequest, ChatResponse, ErrorBody},
    grok::{DEFAULT_MODEL, PROVIDER},
    types::{CompletionRequest, CompletionResponse, Usage},
};

const DEFAULT_BASE_URL: &str = "https://api.x.ai";

/// Grok generations for long RFP answers can take minutes
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Client for xAI's chat-completions endpoint
pub struct GrokClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl GrokClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::authentication("API key cannot be empty"));
        }

        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            http,
        })
    }

    /// Point the client at another host (a proxy, or a mock server in tests)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn post_chat(&self, body: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        tracing::debug!(model = body.model, max_tokens = body.max_tokens, "Requesting Grok completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse().ok());
            let text = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, error_message(status, text), retry_after));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| LlmError::invalid_response(format!("malformed completion body: {e}")))
    }
}

/// Prefers the provider's `error.message`, then the raw body, then the status text
fn error_message(status: StatusCode, body: String) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(&body) {
        return parsed.error.message;
    }
    if body.trim().is_empty() {
        return status.canonical_reason().unwrap_or("no response body").to_string();
    }
    body
}

fn error_for_status(status: StatusCode, message: String, retry_after: Option<u64>) -> LlmError {
    match status {
        // xAI answers a wrong key with 400 "Incorrect API key provided"
        StatusCode::BAD_REQUEST if message.to_lowercase().contains("api key") => {
            LlmError::authentication(message)
        }
        StatusCode::BAD_REQUEST | StatusCode::PAYLOAD_TOO_LARGE => LlmError::invalid_request(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::authentication(message),
        StatusCode::TOO_MANY_REQUESTS => LlmError::rate_limit(message, retry_after),
        _ => LlmError::api(status.as_u16(), message),
    }
}

#[async_trait]
impl LlmClient for GrokClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };
        let response = self.post_chat(&body).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::invalid_response("no completion choices returned"))?;

        Ok(CompletionResponse {
            text: choice.message.content.unwrap_or_default(),
            model: response.model,
            usage: response
                .usage
                .map(|u| Usage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                })
                .unwrap_or_default(),
            finish_reason: choice.finish_reason,
        })
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_mentioning_key_is_authentication() {
        let err = error_for_status(
            StatusCode::BAD_REQUEST,
            "Incorrect API key provided".to_string(),
            None,
        );
        assert!(matches!(err, LlmError::Authentication { .. }));
    }

    #[test]
    fn server_error_keeps_status() {
        let err = error_for_status(StatusCode::BAD_GATEWAY, "upstream".to_string(), None);
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn rate_limit_carries_retry_after() {
        let err = error_for_status(StatusCode::TOO_MANY_REQUESTS, "slow".to_string(), Some(7));
        assert!(matches!(
            err,
            LlmError::RateLimit {
                retry_after: Some(7),
                ..
            }
        ));
    }

    #[test]
    fn error_message_prefers_provider_json() {
        let body = r#"{"error":{"message":"model not found"}}"#.to_string();
        assert_eq!(error_message(StatusCode::NOT_FOUND, body), "model not found");
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "  ".to_string()),
            "Bad Gateway"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GrokClient::new("key")
            .unwrap()
            .with_base_url("http://localhost:1234/");
        assert_eq!(client.base_url, "http://localhost:1234");
    }
}
