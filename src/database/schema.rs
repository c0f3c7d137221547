/*!
 * Cache table layout.
 *
 * The layout version is kept in SQLite's `user_version` pragma. A file from
 * an older layout is refused rather than rewritten, since a cache can always
 * be rebuilt by deleting it.
 */

use anyhow::{bail, Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Layout version written to `user_version`
pub const SCHEMA_VERSION: i32 = 1;

const CACHE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS translation_cache (
        cache_key TEXT PRIMARY KEY NOT NULL,
        translated_text TEXT NOT NULL,
        model TEXT NOT NULL,
        created_at TEXT NOT NULL,
        hit_count INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_cache_created ON translation_cache(created_at);
"#;

/// Lay out a fresh file, accept a current one, refuse an outdated one
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    match layout_version(conn)? {
        0 => {
            info!("Creating cache tables (layout v{})", SCHEMA_VERSION);
            conn.execute_batch("PRAGMA journal_mode=WAL;")
                .context("Failed to enable WAL journal")?;
            conn.execute_batch(CACHE_TABLE).context("Failed to create cache tables")?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .context("Failed to record cache layout version")?;
        }
        version if version < SCHEMA_VERSION => bail!(
            "Unsupported cache layout v{} (expected v{}); remove the cache file to rebuild it",
            version,
            SCHEMA_VERSION
        ),
        version => debug!("Cache layout v{} is current", version),
    }
    Ok(())
}

fn layout_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .context("Failed to read cache layout version")
}
