//! Write-side repository for notes and their derived rows.
//!
//! # Responsibility
//! - Upsert note rows keyed by normalized path.
//! - Replace headings, outbound links, and chunks for one note.
//! - Fetch link-resolution candidates for a raw wikilink target.
//!
//! # Invariants
//! - Every `replace_*` call deletes all prior rows for the note before
//!   inserting, so rows from two passes are never mixed.
//! - Upserting an existing note keeps `created_at` and updates in place; it
//!   never deletes the row (which would cascade into inbound state).
//! - Callers wrap one note's calls in a single transaction.

use crate::index::links::{LinkCandidate, ResolvedLink};
use crate::model::note::NoteUpsert;
use crate::model::rows::{ChunkRecord, Heading, HeadingRecord};
use crate::repo::{ensure_index_connection_ready, offset_to_db, RepoError, RepoResult};
use rusqlite::{params, Connection};

/// Repository interface the index pipeline writes through.
pub trait NoteRepository {
    /// Inserts or updates one note row.
    fn upsert_note(&self, note: &NoteUpsert) -> RepoResult<()>;
    /// Returns notes whose path, title, or file name could equal `target`.
    ///
    /// The result is a superset; exact matching is done by the caller.
    fn find_link_candidates(&self, target: &str) -> RepoResult<Vec<LinkCandidate>>;
    /// Replaces all headings of `note_id` and returns the stored rows.
    fn replace_headings(&self, note_id: &str, headings: &[Heading])
        -> RepoResult<Vec<HeadingRecord>>;
    /// Replaces all outbound links of `note_id`.
    fn replace_links(&self, note_id: &str, links: &[ResolvedLink]) -> RepoResult<()>;
    /// Replaces all chunks of `note_id`.
    fn replace_chunks(&self, note_id: &str, chunks: &[ChunkRecord]) -> RepoResult<()>;
    /// Deletes one note and its owned rows. Returns whether a row existed.
    fn delete_note(&self, note_id: &str) -> RepoResult<bool>;
}

/// SQLite-backed write repository.
///
/// Holds a plain connection reference so it works equally over a
/// `Connection` or a `Transaction`.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository after verifying the index schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_index_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Constructs a repository over a connection already known to be migrated.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn upsert_note(&self, note: &NoteUpsert) -> RepoResult<()> {
        let metadata = serde_json::to_string(&note.metadata).map_err(|err| {
            RepoError::InvalidData(format!(
                "metadata for `{}` is not serializable: {err}",
                note.note_id
            ))
        })?;

        self.conn.execute(
            "INSERT INTO notes (note_id, path, title, modified_at, word_count, metadata)
             VALUES (?1, ?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(note_id) DO UPDATE SET
                title = excluded.title,
                modified_at = excluded.modified_at,
                word_count = excluded.word_count,
                metadata = excluded.metadata;",
            params![
                note.note_id.as_str(),
                note.title.as_str(),
                note.modified_at,
                note.word_count,
                metadata,
            ],
        )?;

        Ok(())
    }

    fn find_link_candidates(&self, target: &str) -> RepoResult<Vec<LinkCandidate>> {
        // instr() is case-sensitive, unlike LIKE.
        let mut stmt = self.conn.prepare(
            "SELECT path, title
             FROM notes
             WHERE title = ?1
                OR instr(path, ?1) > 0
             ORDER BY path ASC;",
        )?;
        let mut rows = stmt.query([target])?;
        let mut candidates = Vec::new();
        while let Some(row) = rows.next()? {
            candidates.push(LinkCandidate {
                path: row.get("path")?,
                title: row.get("title")?,
            });
        }
        Ok(candidates)
    }

    fn replace_headings(
        &self,
        note_id: &str,
        headings: &[Heading],
    ) -> RepoResult<Vec<HeadingRecord>> {
        self.conn
            .execute("DELETE FROM headings WHERE note_id = ?1;", [note_id])?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO headings (note_id, heading, level, start_offset)
             VALUES (?1, ?2, ?3, ?4);",
        )?;
        let mut stored = Vec::with_capacity(headings.len());
        for heading in headings {
            stmt.execute(params![
                note_id,
                heading.text.as_str(),
                heading.level,
                offset_to_db(heading.start_offset)?,
            ])?;
            stored.push(HeadingRecord {
                id: self.conn.last_insert_rowid(),
                note_id: note_id.to_string(),
                text: heading.text.clone(),
                level: heading.level,
                start_offset: heading.start_offset,
            });
        }

        Ok(stored)
    }

    fn replace_links(&self, note_id: &str, links: &[ResolvedLink]) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM links WHERE src_note = ?1;", [note_id])?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO links (src_note, dst_note, link_text, occurrences)
             VALUES (?1, ?2, ?3, ?4);",
        )?;
        for link in links {
            stmt.execute(params![
                note_id,
                link.dst_note.as_str(),
                link.link_text.as_str(),
                link.occurrences,
            ])?;
        }

        Ok(())
    }

    fn replace_chunks(&self, note_id: &str, chunks: &[ChunkRecord]) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM chunks WHERE note_id = ?1;", [note_id])?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO chunks (chunk_id, note_id, heading_id, start_offset, end_offset, text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        )?;
        for chunk in chunks {
            if chunk.note_id != note_id {
                return Err(RepoError::InvalidData(format!(
                    "chunk `{}` belongs to `{}`, not `{note_id}`",
                    chunk.chunk_id, chunk.note_id
                )));
            }
            stmt.execute(params![
                chunk.chunk_id.as_str(),
                note_id,
                chunk.heading_id,
                offset_to_db(chunk.start_offset)?,
                offset_to_db(chunk.end_offset)?,
                chunk.text.as_str(),
            ])?;
        }

        Ok(())
    }

    fn delete_note(&self, note_id: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE note_id = ?1;", [note_id])?;
        Ok(changed > 0)
    }
}
