/*!
 * Translation caching functionality.
 *
 * Translations are stored under a SHA-256 key derived from the chunk body,
 * the model and the temperature. Entries older than the configured TTL are
 * treated as absent but never removed on read. Storage is pluggable: the
 * SQLite repository persists across runs, the in-memory store serves tests
 * and one-off runs.
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

/// Default lifetime of a cache entry
pub const DEFAULT_TTL_DAYS: i64 = 30;

/// Content-addressed cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a chunk translated with the given parameters.
    ///
    /// `instruction` is the system instruction before per-chunk details are
    /// added, so it carries the target language and any configured prompt.
    /// Fields are joined with a NUL byte so that no two distinct tuples
    /// produce the same hash input.
    pub fn derive(body: &str, model: &str, temperature: f32, instruction: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(body.as_bytes());
        hasher.update([0u8]);
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(temperature.to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(instruction.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored translation
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Hex digest of the key
    pub key: String,
    /// Translated chunk text
    pub translated: String,
    /// Model that produced the translation
    pub model: String,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry stamped with the current time
    pub fn new(key: &CacheKey, translated: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            key: key.as_str().to_string(),
            translated: translated.into(),
            model: model.into(),
            created_at: Utc::now(),
        }
    }

    /// Override the creation time
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Whether the entry is older than `ttl` at `now`
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at) > ttl
    }
}

/// Backend holding cache entries
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Fetch an entry regardless of its age
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Insert or replace an entry
    async fn put(&self, entry: CacheEntry) -> Result<()>;

    /// Short name for log messages
    fn name(&self) -> &'static str;
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[async_trait]
impl CacheStorage for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        self.entries.write().insert(entry.key.clone(), entry);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Cache facade used by the orchestrator.
///
/// Storage failures never propagate: a failed read counts as a miss and a
/// failed write is logged and dropped.
#[derive(Clone)]
pub struct TranslationCache {
    storage: Option<Arc<dyn CacheStorage>>,
    ttl: Duration,
    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
}

impl TranslationCache {
    /// Create a cache over the given storage
    pub fn new(storage: Arc<dyn CacheStorage>, ttl_days: i64) -> Self {
        Self {
            storage: Some(storage),
            ttl: Duration::days(ttl_days),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Cache backed by a fresh in-memory store with the default TTL
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStorage::new()), DEFAULT_TTL_DAYS)
    }

    /// Cache that never stores anything
    pub fn disabled() -> Self {
        Self {
            storage: None,
            ttl: Duration::days(DEFAULT_TTL_DAYS),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.storage.is_some()
    }

    /// Look up a fresh entry
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let storage = self.storage.as_ref()?;

        let found = match storage.get(key.as_str()).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cache read from {} storage failed: {}", storage.name(), e);
                None
            }
        };

        match found {
            Some(entry) if !entry.is_expired(self.ttl, Utc::now()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {}", &key.as_str()[..12]);
                Some(entry)
            }
            Some(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache entry {} expired", &key.as_str()[..12]);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for {}", &key.as_str()[..12]);
                None
            }
        }
    }

    /// Store an entry; returns whether it was written
    pub async fn put(&self, entry: CacheEntry) -> bool {
        let Some(storage) = self.storage.as_ref() else {
            return false;
        };

        match storage.put(entry).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Cache write to {} storage failed: {}", storage.name(), e);
                false
            }
        }
    }

    /// Hits, misses and hit rate since creation
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for TranslationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationCache")
            .field("storage", &self.storage.as_ref().map(|s| s.name()))
            .field("ttl_days", &self.ttl.num_days())
            .finish()
    }
}
