/*!
 * Handle on the SQLite file that backs the translation cache.
 *
 * One connection is shared by every clone of the handle. Queries run on
 * tokio's blocking pool through `run`, one at a time.
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::schema;

/// Application folder under the platform data directory
const APP_DIR: &str = "mdtranslate";

/// Cache file inside `APP_DIR`
const CACHE_FILE: &str = "cache.db";

/// Where the cache lives
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Shared SQLite connection with the cache schema applied
#[derive(Clone)]
pub struct DatabaseConnection {
    location: Location,
    connection: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open the cache file under the user's data directory
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Open the cache file at `path`, creating missing parent folders
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory: {:?}", parent))?;
        }

        info!("Opening translation cache at: {:?}", path);
        let connection =
            Connection::open(&path).with_context(|| format!("Failed to open cache database: {:?}", path))?;

        Self::prepared(connection, Location::File(path))
    }

    /// Throwaway cache that disappears with the last clone
    pub fn new_in_memory() -> Result<Self> {
        debug!("Opening in-memory translation cache");
        let connection = Connection::open_in_memory().context("Failed to open in-memory cache database")?;
        Self::prepared(connection, Location::Memory)
    }

    fn prepared(connection: Connection, location: Location) -> Result<Self> {
        schema::initialize_schema(&connection)?;
        Ok(Self {
            location,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// `<data dir>/mdtranslate/cache.db`, falling back to `~/.local/share`
    pub fn default_database_path() -> Result<PathBuf> {
        dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
            .map(|base| base.join(APP_DIR).join(CACHE_FILE))
            .ok_or_else(|| anyhow!("Could not determine a data directory for the cache"))
    }

    /// Cache file path, or `:memory:`
    pub fn path(&self) -> &Path {
        match &self.location {
            Location::File(path) => path,
            Location::Memory => Path::new(":memory:"),
        }
    }

    /// Run a query against the connection without blocking the runtime
    pub async fn run<F, T>(&self, query: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let guard = connection.lock();
            query(&*guard)
        })
        .await
        .context("Cache query task panicked")?
    }

    /// Bytes on disk; zero when in memory or unreadable
    pub fn file_size(&self) -> u64 {
        match &self.location {
            Location::File(path) => std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            Location::Memory => 0,
        }
    }
}
