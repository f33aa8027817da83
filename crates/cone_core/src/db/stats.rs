//! Row-count statistics and file inspection for maintenance tooling.

use super::migrations::current_version;
use super::{DbError, DbResult};
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Snapshot of index table sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    pub schema_version: u32,
    pub notes: u64,
    pub headings: u64,
    pub links: u64,
    pub chunks: u64,
}

/// Location, size, and table counts of one database file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    pub path: PathBuf,
    pub exists: bool,
    /// Size of the main database file; `None` when it does not exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<DatabaseStats>,
}

/// Counts rows in every index table.
pub fn database_stats(conn: &Connection) -> DbResult<DatabaseStats> {
    Ok(DatabaseStats {
        schema_version: current_version(conn)?,
        notes: count_rows(conn, "notes")?,
        headings: count_rows(conn, "headings")?,
        links: count_rows(conn, "links")?,
        chunks: count_rows(conn, "chunks")?,
    })
}

/// Inspects a database file without creating or migrating it.
///
/// A missing file yields `exists: false`; an existing one is opened
/// read-only for the table counts.
pub fn database_info(path: impl AsRef<Path>) -> DbResult<DatabaseInfo> {
    let path = path.as_ref();
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(DatabaseInfo {
                path: path.to_path_buf(),
                exists: false,
                size_bytes: None,
                tables: None,
            });
        }
        Err(source) => {
            return Err(DbError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    Ok(DatabaseInfo {
        path: path.to_path_buf(),
        exists: true,
        size_bytes: Some(metadata.len()),
        tables: Some(database_stats(&conn)?),
    })
}

fn count_rows(conn: &Connection, table: &'static str) -> DbResult<u64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })?;
    Ok(u64::try_from(count).unwrap_or_default())
}
