/*!
 * SQLite persistence for the translation cache.
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

pub use connection::DatabaseConnection;
pub use models::{CacheRecord, CacheStats};
pub use repository::Repository;
