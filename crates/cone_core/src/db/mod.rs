//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the note index.
//! - Apply schema migrations in deterministic order.
//! - Report coarse table statistics for maintenance tooling.
//! - Reset a database file back to an empty, migrated schema.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write index data before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub mod migrations;
mod open;
mod stats;

pub use open::{open_db, open_db_in_memory, reset_db};
pub use stats::{database_info, database_stats, DatabaseInfo, DatabaseStats};

/// File name used for the per-vault index database.
pub const DEFAULT_DB_FILE_NAME: &str = ".cone_index.sqlite3";

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Filesystem failure on the database file or its WAL sidecars.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "index schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Io { path, source } => write!(f, "`{}`: {source}", path.display()),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Returns the index database location for one vault directory.
///
/// Each vault owns its own database file; callers pass the resulting
/// connection explicitly into every core operation.
pub fn default_db_path(vault_dir: impl AsRef<Path>) -> PathBuf {
    vault_dir.as_ref().join(DEFAULT_DB_FILE_NAME)
}
