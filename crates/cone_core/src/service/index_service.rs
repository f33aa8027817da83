//! Indexing orchestrator.
//!
//! # Responsibility
//! - Turn one `(path, content, modified_at)` request into a note row plus its
//!   headings, outbound links, and chunks.
//! - Run the whole pass in one `IMMEDIATE` transaction.
//!
//! # Invariants
//! - Steps run in a fixed order: note, headings, links, chunks. Link
//!   resolution sees the note row written earlier in the same pass.
//! - Any failure rolls back the pass and leaves prior state untouched.
//! - Re-indexing identical input yields the same note, link, and chunk rows;
//!   only heading row ids are reassigned.

use crate::index::chunker::{chunk_id, nearest_heading, split_chunks, DEFAULT_MAX_CHUNK_CHARS};
use crate::index::headings::{derive_title, extract_headings};
use crate::index::links::{collect_links, resolve_target};
use crate::model::note::{count_words, normalize_note_path, NoteId, NoteMetadata, NoteUpsert};
use crate::model::rows::ChunkRecord;
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::{ensure_index_connection_ready, RepoError, RepoResult};
use log::{error, info};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const CHUNK_PREVIEW_CHARS: usize = 100;

/// Tunables for one index pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Soft upper bound on chunk size, in characters.
    pub max_chunk_chars: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
        }
    }
}

/// Input for one index pass.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRequest {
    /// Raw storage path; normalized into the note id.
    pub path: String,
    pub content: String,
    /// Modification time in epoch milliseconds.
    pub modified_at: i64,
    pub metadata: NoteMetadata,
}

impl IndexRequest {
    /// Builds a request with empty metadata.
    pub fn new(path: impl Into<String>, content: impl Into<String>, modified_at: i64) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            modified_at,
            metadata: NoteMetadata::new(),
        }
    }
}

/// Summary of one stored chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkSummary {
    pub chunk_id: String,
    pub heading_id: Option<i64>,
    pub start_offset: usize,
    pub end_offset: usize,
    /// First characters of the chunk text, suffixed with `...` when cut.
    pub preview: String,
}

/// Outcome of one index pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexResult {
    pub note_id: NoteId,
    pub title: String,
    pub word_count: u32,
    pub heading_count: usize,
    pub link_count: usize,
    pub chunks: Vec<ChunkSummary>,
}

impl IndexResult {
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

/// Service error for index/remove use-cases.
#[derive(Debug)]
pub enum IndexServiceError {
    /// Path is blank after normalization.
    InvalidPath(String),
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Persistence-layer failure; the pass was rolled back.
    Storage(RepoError),
}

impl Display for IndexServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath(path) => write!(f, "invalid note path: `{path}`"),
            Self::NoteNotFound(note_id) => write!(f, "note not found: {note_id}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IndexServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for IndexServiceError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for IndexServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.into())
    }
}

/// Write-side facade owning the unit of work for each index pass.
pub struct IndexService<'conn> {
    conn: &'conn mut Connection,
    config: IndexConfig,
}

impl<'conn> IndexService<'conn> {
    /// Creates a service after verifying the connection carries the index schema.
    pub fn try_new(
        conn: &'conn mut Connection,
        config: IndexConfig,
    ) -> Result<Self, IndexServiceError> {
        ensure_index_connection_ready(conn)?;
        Ok(Self { conn, config })
    }

    /// Indexes one note, replacing everything previously derived from it.
    pub fn index_note(&mut self, request: &IndexRequest) -> Result<IndexResult, IndexServiceError> {
        let note_id = normalize_note_path(&request.path)
            .ok_or_else(|| IndexServiceError::InvalidPath(request.path.clone()))?;
        let started_at = Instant::now();

        let outcome = self.index_in_transaction(&note_id, request);
        match &outcome {
            Ok(result) => info!(
                "event=note_index module=index status=ok headings={} links={} chunks={} bytes={} duration_ms={}",
                result.heading_count,
                result.link_count,
                result.chunk_count(),
                request.content.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=note_index module=index status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        outcome
    }

    /// Deletes one note. Headings, outbound links, and chunks cascade; links
    /// from other notes pointing at it are kept.
    pub fn remove_note(&mut self, path: &str) -> Result<(), IndexServiceError> {
        let note_id = normalize_note_path(path)
            .ok_or_else(|| IndexServiceError::InvalidPath(path.to_string()))?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = SqliteNoteRepository::new(&tx).delete_note(&note_id)?;
        if !removed {
            return Err(IndexServiceError::NoteNotFound(note_id));
        }
        tx.commit()?;

        info!("event=note_remove module=index status=ok");
        Ok(())
    }

    fn index_in_transaction(
        &mut self,
        note_id: &str,
        request: &IndexRequest,
    ) -> Result<IndexResult, IndexServiceError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = run_index(&SqliteNoteRepository::new(&tx), note_id, request, self.config)?;
        tx.commit()?;
        Ok(result)
    }
}

/// Runs the index pipeline against any repository.
///
/// Transaction handling is the caller's job.
pub fn run_index<R: NoteRepository>(
    repo: &R,
    note_id: &str,
    request: &IndexRequest,
    config: IndexConfig,
) -> RepoResult<IndexResult> {
    let body = request.content.as_str();
    let headings = extract_headings(body);
    let title = derive_title(note_id, &headings);
    let word_count = count_words(body);

    repo.upsert_note(&NoteUpsert {
        note_id: note_id.to_string(),
        title: title.clone(),
        modified_at: request.modified_at,
        word_count,
        metadata: request.metadata.clone(),
    })?;

    let stored_headings = repo.replace_headings(note_id, &headings)?;

    let links = collect_links(body, |target| {
        repo.find_link_candidates(target)
            .map(|candidates| resolve_target(target, &candidates))
    })?;
    repo.replace_links(note_id, &links)?;

    let heading_offsets: Vec<usize> = stored_headings
        .iter()
        .map(|heading| heading.start_offset)
        .collect();
    let chunks: Vec<ChunkRecord> = split_chunks(body, config.max_chunk_chars)
        .into_iter()
        .map(|span| ChunkRecord {
            chunk_id: chunk_id(note_id, span.start_offset),
            note_id: note_id.to_string(),
            heading_id: nearest_heading(&heading_offsets, span.start_offset)
                .map(|index| stored_headings[index].id),
            start_offset: span.start_offset,
            end_offset: span.end_offset,
            text: span.text.to_string(),
        })
        .collect();
    repo.replace_chunks(note_id, &chunks)?;

    Ok(IndexResult {
        note_id: note_id.to_string(),
        title,
        word_count,
        heading_count: stored_headings.len(),
        link_count: links.len(),
        chunks: chunks
            .iter()
            .map(|chunk| ChunkSummary {
                chunk_id: chunk.chunk_id.clone(),
                heading_id: chunk.heading_id,
                start_offset: chunk.start_offset,
                end_offset: chunk.end_offset,
                preview: preview_text(&chunk.text, CHUNK_PREVIEW_CHARS),
            })
            .collect(),
    })
}

fn preview_text(text: &str, max_chars: usize) -> String {
    let mut preview: String = text.chars().take(max_chars).collect();
    if text.chars().nth(max_chars).is_some() {
        preview.push_str("...");
    }
    preview
}
