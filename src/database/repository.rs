/*!
 * Repository for the persistent translation cache.
 */

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::debug;
use rusqlite::{params, OptionalExtension};

use super::connection::DatabaseConnection;
use super::models::{format_timestamp, CacheRecord, CacheStats};
use crate::translation::cache::{CacheEntry, CacheStorage};

/// SQLite-backed cache storage
#[derive(Clone)]
pub struct Repository {
    db: DatabaseConnection,
}

impl Repository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Repository on the database at the default location
    pub fn new_default() -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new_default()?))
    }

    /// Repository on a fresh in-memory database
    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new_in_memory()?))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Fetch a cached translation and bump its hit counter
    pub async fn get_cached_translation(&self, cache_key: &str) -> Result<Option<CacheRecord>> {
        let cache_key = cache_key.to_string();

        self.db
            .run(move |conn| {
                let record = conn
                    .query_row(
                        r#"
                        SELECT cache_key, translated_text, model, created_at, hit_count
                        FROM translation_cache
                        WHERE cache_key = ?1
                        "#,
                        [&cache_key],
                        |row| {
                            Ok(CacheRecord {
                                cache_key: row.get(0)?,
                                translated_text: row.get(1)?,
                                model: row.get(2)?,
                                created_at: row.get(3)?,
                                hit_count: row.get(4)?,
                            })
                        },
                    )
                    .optional()?;

                if record.is_some() {
                    conn.execute(
                        "UPDATE translation_cache SET hit_count = hit_count + 1 WHERE cache_key = ?1",
                        [&cache_key],
                    )?;
                }

                Ok(record)
            })
            .await
    }

    /// Insert a translation, replacing text and timestamp of an existing key
    pub async fn cache_translation(&self, record: CacheRecord) -> Result<()> {
        self.db
            .run(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO translation_cache (cache_key, translated_text, model, created_at, hit_count)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(cache_key) DO UPDATE SET
                        translated_text = excluded.translated_text,
                        model = excluded.model,
                        created_at = excluded.created_at
                    "#,
                    params![
                        record.cache_key,
                        record.translated_text,
                        record.model,
                        record.created_at,
                        record.hit_count,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Entry counts and hit totals; `ttl_days` decides what counts as expired
    pub async fn get_cache_stats(&self, ttl_days: i64) -> Result<CacheStats> {
        let cutoff = format_timestamp(Utc::now() - Duration::days(ttl_days));
        let file_size_bytes = self.db.file_size();

        self.db
            .run(move |conn| {
                let total_entries: i64 =
                    conn.query_row("SELECT COUNT(*) FROM translation_cache", [], |row| row.get(0))?;

                let total_hits: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(hit_count), 0) FROM translation_cache",
                    [],
                    |row| row.get(0),
                )?;

                let expired_entries: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM translation_cache WHERE created_at < ?1",
                    [&cutoff],
                    |row| row.get(0),
                )?;

                Ok(CacheStats {
                    total_entries,
                    total_hits,
                    expired_entries,
                    file_size_bytes,
                })
            })
            .await
    }

    /// Delete every cached translation, returning how many were removed
    pub async fn clear_cache(&self) -> Result<i64> {
        self.db
            .run(|conn| {
                let deleted = conn.execute("DELETE FROM translation_cache", [])?;
                debug!("Removed {} cache entries", deleted);
                Ok(deleted as i64)
            })
            .await
    }
}

#[async_trait]
impl CacheStorage for Repository {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let record = self.get_cached_translation(key).await?;
        Ok(record.and_then(|r| {
            let key = r.cache_key.clone();
            let entry = r.into_entry();
            if entry.is_none() {
                debug!("Ignoring cache row {} with unreadable timestamp", key);
            }
            entry
        }))
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        self.cache_translation(CacheRecord::from(&entry)).await
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
