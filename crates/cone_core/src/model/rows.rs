//! Rows derived from one index pass over a note body.
//!
//! # Invariants
//! - Offsets are UTF-8 byte offsets into the body that produced the row.
//! - `ChunkRecord::heading_id` is a weak reference; it becomes `None` when the
//!   heading row is deleted.

use crate::model::note::NoteId;
use serde::Serialize;

/// Heading line found by the extractor, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub text: String,
    /// Count of leading `#` characters, 1..=6.
    pub level: u8,
    /// Offset of the heading line's first character in the untrimmed body.
    pub start_offset: usize,
}

/// Persisted heading row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingRecord {
    /// Store-generated row id, referenced by chunks.
    pub id: i64,
    pub note_id: NoteId,
    pub text: String,
    pub level: u8,
    pub start_offset: usize,
}

/// Directed reference edge `src_note -> dst_note`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub src_note: NoteId,
    /// Resolved note path, or the raw target for forward references.
    pub dst_note: String,
    /// Alias or raw target of the first occurrence.
    pub link_text: String,
    /// Number of mentions that resolved to `dst_note`.
    pub occurrences: u32,
}

/// Persisted chunk row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkRecord {
    /// Deterministic id derived from `(note_id, start_offset)`.
    pub chunk_id: String,
    pub note_id: NoteId,
    pub heading_id: Option<i64>,
    pub start_offset: usize,
    pub end_offset: usize,
    pub text: String,
}
