//! Lector Storage
//!
//! Durable state for the Lector playback core: resume records, chapter
//! pointers, per-document progress and the global "now playing" record.
//!
//! # Architecture
//!
//! - **Key/value backend**: everything goes through [`PersistentStore`];
//!   [`SqliteStore`] for real sessions, [`MemoryStore`] for tests and
//!   ephemeral runs
//! - **JSON values**: records are serialized with `serde_json`
//! - **Vertical slices**: [`resume`] and [`global_record`] each own their keys
//!
//! # Example
//!
//! ```rust,no_run
//! use lector_storage::{ResumeStore, SqliteStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open("sqlite://lector.db").await?;
//! let resume = ResumeStore::new(Arc::new(store));
//!
//! let last = resume.last_played().await?;
//! # let _ = last;
//! # Ok(())
//! # }
//! ```
//!
//! [`PersistentStore`]: lector_core::PersistentStore

mod error;
mod json;
mod memory;
mod sqlite;

pub mod global_record;
pub mod keys;
pub mod resume;

pub use error::StorageError;
pub use memory::{MemoryContentStore, MemoryStore};
pub use resume::{ResumeStore, ResumeTarget, SaveOutcome};
pub use sqlite::SqliteStore;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Bring the `kv_store` schema up to date
///
/// # Errors
///
/// Returns an error if a migration fails to apply
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Open a WAL-mode `SQLite` pool, creating the file if needed
///
/// # Errors
///
/// Returns an error if `database_url` is malformed or the connection fails
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!(url = %database_url, "Creating SQLite pool");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    tracing::info!(url = %database_url, "SQLite pool ready");
    Ok(pool)
}
