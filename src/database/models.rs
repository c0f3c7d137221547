/*!
 * Row types for the cache table.
 */

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::translation::cache::CacheEntry;

/// One row of `translation_cache`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Hex SHA-256 cache key
    pub cache_key: String,
    /// Translated chunk text
    pub translated_text: String,
    /// Model that produced the translation
    pub model: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
    /// Number of reads served from this row
    pub hit_count: i64,
}

impl CacheRecord {
    /// Convert into a cache entry, `None` if the timestamp is unreadable
    pub fn into_entry(self) -> Option<CacheEntry> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .ok()?
            .with_timezone(&Utc);

        Some(CacheEntry {
            key: self.cache_key,
            translated: self.translated_text,
            model: self.model,
            created_at,
        })
    }
}

impl From<&CacheEntry> for CacheRecord {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            cache_key: entry.key.clone(),
            translated_text: entry.translated.clone(),
            model: entry.model.clone(),
            created_at: format_timestamp(entry.created_at),
            hit_count: 0,
        }
    }
}

/// Fixed-width UTC timestamp, so stored values sort chronologically as text
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Aggregate figures for the cache table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Total number of cache entries
    pub total_entries: i64,
    /// Total number of cache hits
    pub total_hits: i64,
    /// Entries older than the TTL that would be ignored on read
    pub expired_entries: i64,
    /// Database file size in bytes
    pub file_size_bytes: u64,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache entries: {} ({} expired), hits: {}, size: {} KB",
            self.total_entries,
            self.expired_entries,
            self.total_hits,
            self.file_size_bytes / 1024
        )
    }
}
