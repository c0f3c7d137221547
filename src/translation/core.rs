/*!
 * Core translation service implementation.
 *
 * This module contains the main TranslationService struct, the request-level
 * facade over the pipeline: validate, protect, chunk, translate, reassemble
 * and restore.
 */

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app_config::Config;
use crate::database::{DatabaseConnection, Repository};
use crate::errors::TranslationError;
use crate::language_utils;
use crate::providers::openai::OpenAI;
use crate::providers::Provider;

use super::analysis::{extract_key_terms, identify_format_elements, FormatElements};
use super::cache::{TranslationCache, DEFAULT_TTL_DAYS};
use super::chunker::chunk;
use super::orchestrator::{Orchestrator, ProgressCallback, RetryPolicy, TranslationParams};
use super::prompts::PromptTemplate;
use super::protector::protect;
use super::restorer::restore_with_report;

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

/// Inbound translation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRequest {
    /// Markdown document
    pub text: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl TranslationRequest {
    /// Request with the default model and temperature
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: default_model(),
            temperature: default_temperature(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Result of a translation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResponse {
    /// Reassembled and restored document
    pub translated_text: String,

    /// Number of chunks the document was split into
    pub chunks: usize,

    /// Fraction of chunks translated successfully (0.0 to 1.0)
    pub success_rate: f64,

    /// Number of elements shielded from translation
    pub protected_elements: usize,

    /// Zero-based indices of chunks that carry a failure marker
    pub failed_chunks: Vec<usize>,

    /// Placeholder tokens left in the output because they could not be resolved
    pub unresolved_placeholders: Vec<String>,

    /// Structural census of the input
    pub format_elements: FormatElements,

    /// Terms listed in the instruction
    pub key_terms: Vec<String>,
}

/// Translation service for Markdown documents
#[derive(Debug, Clone)]
pub struct TranslationService {
    orchestrator: Orchestrator,

    /// ISO code of the target language
    target_language: String,

    /// Name of the target language used in the instruction
    language_name: String,

    concurrency: usize,
    max_chunk_chars: usize,
    max_input_chars: usize,
    max_key_terms: usize,
}

impl TranslationService {
    /// Create a service talking to the configured endpoint with the configured cache
    pub fn new(config: &Config) -> Result<Self> {
        let provider_config = &config.translation.provider;
        let provider = OpenAI::new(
            config.translation.get_api_key(),
            provider_config.endpoint.clone(),
            provider_config.timeout_secs,
        );

        let cache = Self::open_cache(config)?;
        Ok(Self::with_provider(config, Arc::new(provider), cache))
    }

    /// Create a service around an existing provider and cache
    pub fn with_provider(config: &Config, provider: Arc<dyn Provider>, cache: TranslationCache) -> Self {
        let common = &config.translation.common;
        let retry = RetryPolicy::new(
            common.retry_count,
            common.retry_backoff_ms,
            Duration::from_secs(config.translation.provider.timeout_secs.max(1)),
        );
        let prompt = PromptTemplate::from_override(common.system_prompt.as_deref());

        let language_name = language_utils::get_language_name(&config.target_language).unwrap_or_else(|e| {
            warn!("{}; using the raw code in the instruction", e);
            config.target_language.clone()
        });

        Self {
            orchestrator: Orchestrator::new(provider, cache, retry, prompt),
            target_language: config.target_language.clone(),
            language_name,
            concurrency: common.concurrent_requests,
            max_chunk_chars: common.max_chunk_chars,
            max_input_chars: common.max_input_chars,
            max_key_terms: common.max_key_terms,
        }
    }

    fn open_cache(config: &Config) -> Result<TranslationCache> {
        if !config.cache.enabled {
            debug!("Translation cache disabled");
            return Ok(TranslationCache::disabled());
        }

        let ttl_days = if config.cache.ttl_days > 0 { config.cache.ttl_days } else { DEFAULT_TTL_DAYS };

        let repository = match config.cache.path.as_deref() {
            Some(path) => Self::open_repository(path),
            None => Repository::new_default(),
        };

        match repository {
            Ok(repository) => {
                debug!("Translation cache at {:?}", repository.connection().path());
                Ok(TranslationCache::new(Arc::new(repository), ttl_days))
            }
            Err(e) => {
                warn!("Could not open the translation cache ({}); using an in-memory cache", e);
                Ok(TranslationCache::in_memory())
            }
        }
    }

    fn open_repository(path: &Path) -> Result<Repository> {
        let connection = DatabaseConnection::new(path)
            .with_context(|| format!("Failed to open cache database: {:?}", path))?;
        Ok(Repository::new(connection))
    }

    /// Cache shared by every request of this service
    pub fn cache(&self) -> &TranslationCache {
        self.orchestrator.cache()
    }

    /// ISO code of the target language
    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Reject input that must not enter the pipeline
    pub fn validate(&self, text: &str) -> Result<(), TranslationError> {
        if text.trim().is_empty() {
            return Err(TranslationError::EmptyInput);
        }

        let length = text.chars().count();
        if length > self.max_input_chars {
            return Err(TranslationError::InputTooLong {
                length,
                max: self.max_input_chars,
            });
        }

        Ok(())
    }

    /// Translate a document
    pub async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResponse, TranslationError> {
        self.translate_with_progress(request, None).await
    }

    /// Translate a document, reporting `(finished, total)` chunks as they complete
    pub async fn translate_with_progress(
        &self,
        request: &TranslationRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<TranslationResponse, TranslationError> {
        self.validate(&request.text)?;
        let start_time = Instant::now();

        let format_elements = identify_format_elements(&request.text);
        let key_terms = extract_key_terms(&request.text, self.max_key_terms);

        let protected = protect(&request.text);
        let chunks = chunk(&protected.text, self.max_chunk_chars);
        debug!(
            "Protected {} elements, split into {} chunks",
            protected.elements.len(),
            chunks.len()
        );

        let params = TranslationParams {
            model: request.model.clone(),
            temperature: request.temperature,
            concurrency: self.concurrency,
            target_language: self.language_name.clone(),
            key_terms: key_terms.clone(),
        };

        let results = self.orchestrator.translate_all(&chunks, &params, progress).await;

        let mut joined = String::with_capacity(protected.text.len());
        let mut failed_chunks = Vec::new();
        for (index, (chunk, result)) in chunks.iter().zip(results.iter()).enumerate() {
            if !result.is_success() {
                failed_chunks.push(index);
            }
            joined.push_str(&result.render(&chunk.body));
        }

        let report = restore_with_report(&joined, &protected.elements);

        let success_rate = if chunks.is_empty() {
            1.0
        } else {
            (chunks.len() - failed_chunks.len()) as f64 / chunks.len() as f64
        };

        info!(
            "Translated {} chunks in {:.2}s ({} failed, {} elements restored)",
            chunks.len(),
            start_time.elapsed().as_secs_f64(),
            failed_chunks.len(),
            report.restored
        );

        Ok(TranslationResponse {
            translated_text: report.text,
            chunks: chunks.len(),
            success_rate,
            protected_elements: protected.elements.len(),
            failed_chunks,
            unresolved_placeholders: report.unresolved,
            format_elements,
            key_terms,
        })
    }

    /// Check that the backend answers
    pub async fn test_connection(&self, model: &str) -> Result<(), TranslationError> {
        self.orchestrator.provider().test_connection(model).await?;
        Ok(())
    }
}
