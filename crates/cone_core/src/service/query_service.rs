//! Backlink and graph query layer.
//!
//! # Responsibility
//! - Serve note detail, backlinks, chunks, and the reference graph.
//!
//! # Invariants
//! - Every operation reads inside one transaction, so it never observes a
//!   half-replaced note.
//! - A note is reachable through its path, title, file name, or file stem;
//!   backlinks cover every one of those link targets.

use crate::model::note::{
    normalize_note_path, note_file_name, note_file_stem, NoteId, NoteRecord,
};
use crate::model::rows::ChunkRecord;
use crate::model::views::{Backlink, GraphEdge, GraphNode, NoteGraph, NoteInfo};
use crate::repo::query_repo::{NoteQueryRepository, SqliteQueryRepository};
use crate::repo::{ensure_index_connection_ready, RepoError};
use log::debug;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Node limit used when the caller passes none.
pub const DEFAULT_GRAPH_LIMIT: u32 = 200;

/// Graph query parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphQuery {
    /// Maximum node count; `None` means [`DEFAULT_GRAPH_LIMIT`].
    pub limit: Option<u32>,
    /// Minimum occurrences for an edge; zero behaves as one.
    pub min_degree: u32,
}

/// Service error for read use-cases.
#[derive(Debug)]
pub enum QueryServiceError {
    /// Path is blank after normalization.
    InvalidPath(String),
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Persistence-layer failure.
    Storage(RepoError),
}

impl Display for QueryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath(path) => write!(f, "invalid note path: `{path}`"),
            Self::NoteNotFound(note_id) => write!(f, "note not found: {note_id}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QueryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for QueryServiceError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for QueryServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.into())
    }
}

/// Read-side facade over an index connection.
pub struct QueryService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> QueryService<'conn> {
    /// Creates a service after verifying the connection carries the index schema.
    pub fn try_new(conn: &'conn Connection) -> Result<Self, QueryServiceError> {
        ensure_index_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Returns note metadata, headings, backlinks, and outbound links.
    pub fn get_note_info(&self, path: &str) -> Result<NoteInfo, QueryServiceError> {
        let note_id = normalize_path(path)?;
        self.read(|repo| note_info(repo, &note_id))
    }

    /// Returns inbound references to one note, strongest first.
    pub fn get_backlinks(&self, path: &str) -> Result<Vec<Backlink>, QueryServiceError> {
        let note_id = normalize_path(path)?;
        self.read(|repo| {
            let note = require_note(repo, &note_id)?;
            Ok(repo.list_backlinks(&backlink_targets(&note))?)
        })
    }

    /// Returns the most recently modified notes and the edges between notes.
    pub fn get_graph(&self, query: GraphQuery) -> Result<NoteGraph, QueryServiceError> {
        let limit = normalize_graph_limit(query.limit);
        let min_occurrences = query.min_degree.max(1);
        let graph = self.read(|repo| note_graph(repo, limit, min_occurrences))?;
        debug!(
            "event=graph_query module=query status=ok limit={} min_degree={} nodes={} edges={}",
            limit,
            min_occurrences,
            graph.nodes.len(),
            graph.edges.len()
        );
        Ok(graph)
    }

    /// Returns stored chunks of one note in offset order.
    pub fn list_chunks(&self, path: &str) -> Result<Vec<ChunkRecord>, QueryServiceError> {
        let note_id = normalize_path(path)?;
        self.read(|repo| {
            require_note(repo, &note_id)?;
            Ok(repo.list_chunks(&note_id)?)
        })
    }

    fn read<T>(
        &self,
        op: impl FnOnce(&SqliteQueryRepository<'_>) -> Result<T, QueryServiceError>,
    ) -> Result<T, QueryServiceError> {
        // Deferred: the snapshot starts at the first read.
        let tx = self.conn.unchecked_transaction()?;
        let value = op(&SqliteQueryRepository::new(&tx))?;
        tx.commit()?;
        Ok(value)
    }
}

/// Node limit for a graph query. An explicit value is used as given.
pub fn normalize_graph_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_GRAPH_LIMIT)
}

/// Link targets that resolve to `note`: path, title, file name, file stem.
///
/// Blank values are skipped and duplicates removed, keeping first position.
pub fn backlink_targets(note: &NoteRecord) -> Vec<String> {
    let candidates = [
        note.path.as_str(),
        note.title.as_str(),
        note_file_name(&note.path),
        note_file_stem(&note.path),
    ];
    let mut targets: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if candidate.is_empty() || targets.iter().any(|target| target == candidate) {
            continue;
        }
        targets.push(candidate.to_string());
    }
    targets
}

fn normalize_path(path: &str) -> Result<NoteId, QueryServiceError> {
    normalize_note_path(path).ok_or_else(|| QueryServiceError::InvalidPath(path.to_string()))
}

fn require_note<R: NoteQueryRepository>(
    repo: &R,
    note_id: &str,
) -> Result<NoteRecord, QueryServiceError> {
    repo.get_note(note_id)?
        .ok_or_else(|| QueryServiceError::NoteNotFound(note_id.to_string()))
}

fn note_info<R: NoteQueryRepository>(
    repo: &R,
    note_id: &str,
) -> Result<NoteInfo, QueryServiceError> {
    let note = require_note(repo, note_id)?;
    let headings = repo.list_headings(note_id)?;
    let backlinks = repo.list_backlinks(&backlink_targets(&note))?;
    let outbound_links = repo.list_outbound_links(note_id)?;
    Ok(NoteInfo {
        note,
        headings,
        backlinks,
        outbound_links,
    })
}

fn note_graph<R: NoteQueryRepository>(
    repo: &R,
    limit: u32,
    min_occurrences: u32,
) -> Result<NoteGraph, QueryServiceError> {
    let nodes = repo
        .list_recent_notes(limit)?
        .into_iter()
        .map(|note| GraphNode {
            id: note.note_id,
            path: note.path,
            title: note.title,
            modified_at: note.modified_at,
            word_count: note.word_count,
        })
        .collect();
    let edges = repo
        .list_edges(min_occurrences)?
        .into_iter()
        .map(|link| GraphEdge {
            source: link.src_note,
            target: link.dst_note,
            link_text: link.link_text,
            occurrences: link.occurrences,
        })
        .collect();
    Ok(NoteGraph { nodes, edges })
}
