//! Core note indexing logic for Cone.
//!
//! Parses note bodies into headings, wikilinks, and chunks, keeps a
//! reference index in SQLite, and serves backlink and graph views over it.

pub mod db;
pub mod index;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{
    database_info, database_stats, default_db_path, open_db, open_db_in_memory, reset_db,
    DatabaseInfo, DatabaseStats, DbError, DbResult,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError, LoggingOptions};
pub use model::note::{MetadataValue, NoteId, NoteMetadata, NoteRecord};
pub use model::rows::{ChunkRecord, HeadingRecord, LinkRecord};
pub use model::views::{Backlink, GraphEdge, GraphNode, NoteGraph, NoteInfo};
pub use repo::note_repo::{NoteRepository, SqliteNoteRepository};
pub use repo::query_repo::{NoteQueryRepository, SqliteQueryRepository};
pub use repo::{RepoError, RepoResult};
pub use service::index_service::{
    ChunkSummary, IndexConfig, IndexRequest, IndexResult, IndexService, IndexServiceError,
};
pub use service::query_service::{GraphQuery, QueryService, QueryServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
