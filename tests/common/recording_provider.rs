/*!
 * Scripted provider that records every call.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Instant;

use mdtranslate::errors::ProviderError;
use mdtranslate::providers::{CompletionRequest, CompletionResponse, Provider};

/// Recorded call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub at: Instant,
    pub system: String,
    pub user: String,
}

/// Plays back queued outcomes, then echoes the user message
#[derive(Debug, Default)]
pub struct RecordingProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for the next calls, in order
    pub fn with_script(outcomes: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let user = request.user_text().unwrap_or_default().to_string();
        self.calls.lock().push(RecordedCall {
            at: Instant::now(),
            system: request.system_text().unwrap_or_default().to_string(),
            user: user.clone(),
        });

        let outcome = self.script.lock().pop_front().unwrap_or(Ok(user));
        outcome.map(|text| CompletionResponse {
            text,
            prompt_tokens: None,
            completion_tokens: None,
        })
    }

    fn name(&self) -> &str {
        "recording"
    }
}
