use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use url::Url;

use crate::translation::cache::DEFAULT_TTL_DAYS;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Target language code (ISO 639-1 or 639-2)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Translation cache config
    #[serde(default)]
    pub cache: CacheConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Chat completions endpoint settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Model name (e.g., "gpt-4o-mini")
    #[serde(default = "default_model")]
    pub model: String,

    /// API key for the service
    #[serde(default = "String::new")]
    pub api_key: String,

    /// API root (OpenAI or any compatible server)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TranslationConfig {
    /// Backend connection
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

impl TranslationConfig {
    /// Configured API key, or the `OPENAI_API_KEY` environment variable
    pub fn get_api_key(&self) -> String {
        if !self.provider.api_key.trim().is_empty() {
            return self.provider.api_key.clone();
        }
        std::env::var(API_KEY_ENV).unwrap_or_default()
    }

    pub fn get_model(&self) -> &str {
        &self.provider.model
    }
}

/// Pipeline settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Temperature parameter for text generation (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Maximum number of concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Maximum characters per chunk
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Largest accepted document in characters
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// Number of key terms listed in the instruction
    #[serde(default = "default_max_key_terms")]
    pub max_key_terms: usize,

    /// Replacement system prompt
    /// Placeholder: {target_language}
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            concurrent_requests: default_concurrent_requests(),
            max_chunk_chars: default_max_chunk_chars(),
            max_input_chars: default_max_input_chars(),
            max_key_terms: default_max_key_terms(),
            system_prompt: None,
        }
    }
}

/// Translation cache settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Whether translations are cached at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// SQLite file; defaults to the user data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Days after which an entry is ignored
    #[serde(default = "default_ttl_days")]
    pub ttl_days: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            ttl_days: default_ttl_days(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_target_language() -> String {
    "zh".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.1
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_max_chunk_chars() -> usize {
    1500
}

fn default_max_input_chars() -> usize {
    50_000
}

fn default_max_key_terms() -> usize {
    15
}

fn default_ttl_days() -> i64 {
    DEFAULT_TTL_DAYS
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Read a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).context(format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", path.display()))
    }

    /// Read a configuration file, writing the defaults first if it is missing.
    ///
    /// The flag tells whether the file was created.
    pub fn load_or_create(path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            return Ok((Self::load(path)?, false));
        }

        let config = Self::default();
        config.save(path)?;
        Ok((config, true))
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json).context(format!("Failed to write config to file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.target_language)
            .context(format!("Invalid target language: {}", self.target_language))?;

        let common = &self.translation.common;
        if !(0.0..=2.0).contains(&common.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0, got {}", common.temperature));
        }
        if common.concurrent_requests == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }
        if common.max_chunk_chars == 0 {
            return Err(anyhow!("max_chunk_chars must be at least 1"));
        }
        if common.max_input_chars == 0 {
            return Err(anyhow!("max_input_chars must be at least 1"));
        }
        if self.cache.ttl_days <= 0 {
            return Err(anyhow!("cache.ttl_days must be positive"));
        }

        let provider = &self.translation.provider;
        if provider.model.trim().is_empty() {
            return Err(anyhow!("A model name is required"));
        }
        Url::parse(&provider.endpoint).context(format!("Invalid endpoint URL: {}", provider.endpoint))?;

        if self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required: set translation.provider.api_key or {}",
                API_KEY_ENV
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            cache: CacheConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
