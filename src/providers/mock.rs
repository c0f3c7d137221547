/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Echoes the user message back unchanged
 * - `MockProvider::intermittent(n)` - Fails every Nth request
 * - `MockProvider::failing()` - Always fails with a server error
 * - `MockProvider::unauthorized()` - Always fails with an authentication error
 * - `MockProvider::panicking()` - Panics inside the call
 *
 * Every call is recorded, so tests can assert on request counts, timing
 * and the peak number of calls in flight.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
    /// Panics while handling the request
    Panicking,
    /// Rejects the credentials
    Unauthorized,
}

#[derive(Debug, Default)]
struct CallLog {
    requests: Vec<CompletionRequest>,
    started: Vec<Instant>,
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    calls: Arc<Mutex<CallLog>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&CompletionRequest) -> String>,
    /// Per-request delay in milliseconds (optional)
    custom_delay: Option<fn(&CompletionRequest) -> u64>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(CallLog::default())),
            custom_response: None,
            custom_delay: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that waits before answering
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Create a mock that panics on every call
    pub fn panicking() -> Self {
        Self::new(MockBehavior::Panicking)
    }

    /// Create a mock that rejects its credentials
    pub fn unauthorized() -> Self {
        Self::new(MockBehavior::Unauthorized)
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&CompletionRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Set a per-request delay
    pub fn with_custom_delay(mut self, delay: fn(&CompletionRequest) -> u64) -> Self {
        self.custom_delay = Some(delay);
        self
    }

    /// Number of calls received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Copies of every request received, in arrival order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.calls.lock().requests.clone()
    }

    /// Start time of every call, in arrival order
    pub fn call_instants(&self) -> Vec<Instant> {
        self.calls.lock().started.clone()
    }

    fn respond(&self, request: &CompletionRequest) -> CompletionResponse {
        let text = match self.custom_response {
            Some(generator) => generator(request),
            None => request.user_text().unwrap_or_default().to_string(),
        };

        CompletionResponse {
            prompt_tokens: Some(request.messages.iter().map(|m| m.content.len() as u64).sum()),
            completion_tokens: Some(text.len() as u64),
            text,
        }
    }

    async fn answer(&self, request: &CompletionRequest, count: usize) -> Result<CompletionResponse, ProviderError> {
        if let Some(delay) = self.custom_delay {
            tokio::time::sleep(Duration::from_millis(delay(request))).await;
        }

        match self.behavior {
            MockBehavior::Working => Ok(self.respond(request)),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        status_code: 500,
                        message: "Simulated intermittent failure".to_string(),
                    })
                } else {
                    Ok(self.respond(request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated API failure".to_string(),
            }),

            MockBehavior::Empty => Ok(CompletionResponse {
                text: String::new(),
                prompt_tokens: Some(0),
                completion_tokens: Some(0),
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(self.respond(request))
            }

            MockBehavior::Panicking => panic!("Simulated provider panic"),

            MockBehavior::Unauthorized => Err(ProviderError::AuthenticationError("Invalid API key".to_string())),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            in_flight: Arc::clone(&self.in_flight),
            peak_in_flight: Arc::clone(&self.peak_in_flight),
            calls: Arc::clone(&self.calls),
            custom_response: self.custom_response,
            custom_delay: self.custom_delay,
        }
    }
}

/// Decrements the in-flight counter even when the call unwinds
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        {
            let mut calls = self.calls.lock();
            calls.requests.push(request.clone());
            calls.started.push(Instant::now());
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        self.answer(&request, count).await
    }

    fn name(&self) -> &str {
        "mock"
    }
}
