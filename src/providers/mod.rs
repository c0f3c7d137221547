/*!
 * Translation backends.
 *
 * A backend is an opaque chat-style completion service: a list of role-tagged
 * messages goes in, text comes out. Two implementations ship with the crate:
 * - `openai`: any OpenAI-compatible chat completions endpoint
 * - `mock`: configurable in-process backend for tests and dry runs
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::errors::ProviderError;

pub mod mock;
pub mod openai;

/// One message of a chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the sender (system, user, assistant)
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Provider-neutral completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Conversation, system instruction first
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
}

impl CompletionRequest {
    /// Create an empty request for a model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: 0.1,
        }
    }

    /// Append a system message
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::system(content));
        self
    }

    /// Append a user message
    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(content));
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Content of the last user message, if any
    pub fn user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
    }

    /// Content of the first system message, if any
    pub fn system_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str())
    }
}

/// Provider-neutral completion response
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,
    /// Prompt tokens reported by the backend
    pub prompt_tokens: Option<u64>,
    /// Completion tokens reported by the backend
    pub completion_tokens: Option<u64>,
}

/// Common trait for all translation backends
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Run a completion request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Send a minimal request to check credentials and reachability
    async fn test_connection(&self, model: &str) -> Result<(), ProviderError> {
        let request = CompletionRequest::new(model).user("Hello");
        self.complete(request).await.map(|_| ())
    }

    /// Name used in log messages
    fn name(&self) -> &str;
}
