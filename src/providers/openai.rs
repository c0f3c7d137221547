/*!
 * Client for OpenAI-compatible chat completion endpoints.
 */

use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::providers::{ChatMessage, CompletionRequest, CompletionResponse, Provider};

/// Default API root
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// OpenAI client for interacting with a chat completions API
#[derive(Debug)]
pub struct OpenAI {
    client: Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

/// Chat completions request body
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<ChatMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl From<CompletionRequest> for OpenAIRequest {
    fn from(request: CompletionRequest) -> Self {
        Self {
            model: request.model,
            messages: request.messages,
            temperature: Some(request.temperature),
        }
    }
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// One generated alternative
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIResponseMessage,
}

/// Assistant message inside a choice
#[derive(Debug, Deserialize)]
pub struct OpenAIResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Chat completions response body
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
}

impl OpenAI {
    /// Create a client; an empty endpoint selects the public API
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        let endpoint = endpoint.into();
        let timeout = Duration::from_secs(timeout_secs.max(1));
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: if endpoint.trim().is_empty() {
                DEFAULT_ENDPOINT.to_string()
            } else {
                endpoint
            },
            timeout,
        }
    }

    /// Full URL of the chat completions route
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    /// Pull the assistant text out of a response
    pub fn extract_text(response: &OpenAIResponse) -> String {
        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }

    fn map_status(status: StatusCode, body: String) -> ProviderError {
        match status.as_u16() {
            401 | 403 => ProviderError::AuthenticationError(body),
            429 => ProviderError::RateLimitExceeded(body),
            code => ProviderError::ApiError { status_code: code, message: body },
        }
    }

    fn map_transport(error: reqwest::Error, timeout: Duration) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout(timeout.as_millis() as u64)
        } else if error.is_connect() {
            ProviderError::ConnectionError(error.to_string())
        } else {
            ProviderError::RequestFailed(error.to_string())
        }
    }
}

#[async_trait]
impl Provider for OpenAI {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let body = OpenAIRequest::from(request);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_transport(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Chat completions API error ({}): {}", status, error_text);
            return Err(Self::map_status(status, error_text));
        }

        let parsed = response
            .json::<OpenAIResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(CompletionResponse {
            text: Self::extract_text(&parsed),
            prompt_tokens: parsed.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: parsed.usage.as_ref().map(|u| u.completion_tokens),
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}
