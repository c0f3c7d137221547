/*!
 * Concurrent chunk translation.
 *
 * Every chunk is looked up in the cache first. Misses go to the provider
 * with a per-call timeout and exponential back-off between attempts.
 * Results are returned one per chunk, in chunk order, and a chunk that
 * cannot be translated degrades to a visible failure marker instead of
 * failing the request.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, Provider};
use crate::translation::cache::{CacheEntry, CacheKey, TranslationCache};
use crate::translation::chunker::Chunk;
use crate::translation::concurrency::WorkerPool;
use crate::translation::elements::TOKEN_RE;
use crate::translation::prompts::PromptTemplate;

/// Callback receiving `(finished_chunks, total_chunks)`
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Outcome for a single chunk
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationResult {
    /// Translated text, surrounding whitespace included
    Translated(String),
    /// Reason the chunk could not be translated
    Failed(String),
}

impl TranslationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Translated(_))
    }

    /// Text contributed to the reassembled document.
    ///
    /// A failed chunk renders as `[Translation failed: <reason>]` wrapped in
    /// the whitespace of the source chunk.
    pub fn render(&self, source: &str) -> String {
        match self {
            Self::Translated(text) => text.clone(),
            Self::Failed(reason) => {
                let (leading, _, trailing) = split_whitespace(source);
                format!("{}{}{}", leading, failure_marker(reason), trailing)
            }
        }
    }
}

/// Visible marker for an untranslatable chunk
pub fn failure_marker(reason: &str) -> String {
    format!("[Translation failed: {}]", reason)
}

/// Attempt bound, back-off and per-call deadline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total number of provider calls per chunk, at least 1
    pub max_attempts: u32,
    /// Delay before the first retry; doubled before each further one
    pub backoff_base: Duration,
    /// Deadline for a single provider call
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Policy making `retry_count` retries after the first attempt
    pub fn new(retry_count: u32, backoff_ms: u64, timeout: Duration) -> Self {
        Self {
            max_attempts: retry_count.saturating_add(1),
            backoff_base: Duration::from_millis(backoff_ms),
            timeout,
        }
    }

    /// Delay before `attempt` (1-based); zero for the first attempt
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, 1000, Duration::from_secs(60))
    }
}

/// Per-request translation settings
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationParams {
    pub model: String,
    pub temperature: f32,
    /// Maximum number of chunks in flight
    pub concurrency: usize,
    /// Language name used in the instruction
    pub target_language: String,
    /// Terms to keep consistent across chunks
    pub key_terms: Vec<String>,
}

impl Default for TranslationParams {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            concurrency: 4,
            target_language: "Chinese".to_string(),
            key_terms: Vec::new(),
        }
    }
}

/// Drives chunks through cache and provider
#[derive(Debug, Clone)]
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    cache: TranslationCache,
    retry: RetryPolicy,
    prompt: PromptTemplate,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn Provider>, cache: TranslationCache, retry: RetryPolicy, prompt: PromptTemplate) -> Self {
        Self {
            provider,
            cache,
            retry,
            prompt,
        }
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Translate every chunk, returning exactly one result per chunk in order
    pub async fn translate_all(
        &self,
        chunks: &[Chunk],
        params: &TranslationParams,
        progress: Option<ProgressCallback>,
    ) -> Vec<TranslationResult> {
        let total = chunks.len();
        let finished = AtomicUsize::new(0);
        let report = |finished: &AtomicUsize| {
            let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(callback) = progress.as_ref() {
                callback(done, total);
            }
        };

        let pool = WorkerPool::new(params.concurrency);
        debug!(
            "Translating {} chunks with {} workers via {}",
            total,
            pool.workers(),
            self.provider.name()
        );

        pool.run(
            chunks.iter().collect::<Vec<_>>(),
            |index, chunk| {
                let finished = &finished;
                let report = &report;
                async move {
                    let result = self.translate_chunk(index, chunk, params).await;
                    report(finished);
                    result
                }
            },
            |index, message| {
                report(&finished);
                error!("Chunk {} aborted: {}", index + 1, message);
                TranslationResult::Failed(format!("internal error: {}", message))
            },
        )
        .await
    }

    async fn translate_chunk(&self, index: usize, chunk: &Chunk, params: &TranslationParams) -> TranslationResult {
        if !has_translatable_text(&chunk.body) {
            debug!("Chunk {} has no translatable text, passing through", index + 1);
            return TranslationResult::Translated(chunk.body.clone());
        }

        let key = CacheKey::derive(
            &chunk.body,
            &params.model,
            params.temperature,
            &self.prompt.base(&params.target_language),
        );
        if let Some(entry) = self.cache.get(&key).await {
            debug!("Chunk {} served from cache", index + 1);
            return TranslationResult::Translated(entry.translated);
        }

        let (leading, core, trailing) = split_whitespace(&chunk.body);
        let instruction = self.prompt.render(&params.target_language, &chunk.section, &params.key_terms);

        match self.call_with_retry(index, &instruction, core, params).await {
            Ok(output) => {
                let translated = format!("{}{}{}", leading, output.trim(), trailing);
                self.cache
                    .put(CacheEntry::new(&key, translated.clone(), params.model.clone()))
                    .await;
                TranslationResult::Translated(translated)
            }
            Err(e) => {
                error!("Chunk {} ({}) failed: {}", index + 1, chunk.section, e);
                TranslationResult::Failed(e.to_string())
            }
        }
    }

    async fn call_with_retry(
        &self,
        index: usize,
        instruction: &str,
        text: &str,
        params: &TranslationParams,
    ) -> Result<String, ProviderError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.retry.delay_before(attempt);
                warn!(
                    "Retrying chunk {} (attempt {}/{}) after {:?}",
                    index + 1,
                    attempt,
                    max_attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
            }

            let request = CompletionRequest::new(params.model.as_str())
                .system(instruction)
                .user(text)
                .temperature(params.temperature);

            let error = match tokio::time::timeout(self.retry.timeout, self.provider.complete(request)).await {
                Ok(Ok(response)) if !response.text.trim().is_empty() => return Ok(response.text),
                Ok(Ok(_)) => ProviderError::ParseError("empty response".to_string()),
                Ok(Err(e)) if !e.is_retryable() => return Err(e),
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(self.retry.timeout.as_millis() as u64),
            };

            debug!("Chunk {} attempt {} failed: {}", index + 1, attempt, error);
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| ProviderError::RequestFailed("no attempt made".to_string())))
    }
}

/// Whether anything but whitespace and placeholder tokens is left to translate
pub fn has_translatable_text(body: &str) -> bool {
    TOKEN_RE.replace_all(body, "").chars().any(char::is_alphabetic)
}

/// Split into leading whitespace, trimmed core and trailing whitespace
fn split_whitespace(text: &str) -> (&str, &str, &str) {
    let core = text.trim();
    if core.is_empty() {
        return (text, "", "");
    }
    let start = text.len() - text.trim_start().len();
    let end = start + core.len();
    (&text[..start], core, &text[end..])
}
