//! Note record and path-derived identity helpers.
//!
//! # Responsibility
//! - Define the persisted note shape, including structured metadata.
//! - Normalize storage paths into stable note identities.
//! - Derive title and word count from note content.
//!
//! # Invariants
//! - `note_id` always equals the normalized `path`.
//! - Metadata values are scalars only; nested documents are not representable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word regex"));

/// Stable note identity. Equal to the normalized storage path.
pub type NoteId = String;

/// One scalar metadata value attached to a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Structured note metadata keyed by attribute name.
pub type NoteMetadata = BTreeMap<String, MetadataValue>;

/// Persisted note row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteRecord {
    /// Stable identity; same value as `path`.
    pub note_id: NoteId,
    /// Normalized storage path.
    pub path: String,
    /// First level-1 heading text, or file stem.
    pub title: String,
    /// First insert time in epoch milliseconds.
    pub created_at: i64,
    /// Caller-provided modification time in epoch milliseconds.
    pub modified_at: i64,
    pub word_count: u32,
    pub metadata: NoteMetadata,
}

/// Write model used by the index pipeline to upsert one note row.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteUpsert {
    pub note_id: NoteId,
    pub title: String,
    pub modified_at: i64,
    pub word_count: u32,
    pub metadata: NoteMetadata,
}

/// Normalizes a raw storage path into a note identity.
///
/// Returns `None` when nothing but separators or whitespace remains.
pub fn normalize_note_path(raw: &str) -> Option<String> {
    let unified = raw.trim().replace('\\', "/");
    let mut normalized = String::with_capacity(unified.len());
    for segment in unified.split('/').filter(|segment| !segment.is_empty()) {
        // Leading `./` segments only.
        if normalized.is_empty() && segment == "." {
            continue;
        }
        if !normalized.is_empty() {
            normalized.push('/');
        }
        normalized.push_str(segment);
    }

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Returns the last path segment (`dir/Note.md` -> `Note.md`).
pub fn note_file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Returns the last path segment without its extension (`dir/Note.md` -> `Note`).
///
/// A leading dot is part of the name, not an extension (`.inbox` stays `.inbox`).
pub fn note_file_stem(path: &str) -> &str {
    let file_name = note_file_name(path);
    match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(dot) => &file_name[..dot],
    }
}

/// Counts word-like tokens (`\w+`) in note content.
pub fn count_words(content: &str) -> u32 {
    let count = WORD_RE.find_iter(content).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}
