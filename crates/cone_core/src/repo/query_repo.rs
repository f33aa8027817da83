//! Read-side repository for note detail, backlinks, and graph views.
//!
//! # Invariants
//! - Backlinks are ordered `occurrences DESC, source modified_at DESC,
//!   src_note ASC`.
//! - Graph nodes are ordered `modified_at DESC, note_id ASC`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::model::note::{NoteMetadata, NoteRecord};
use crate::model::rows::{ChunkRecord, HeadingRecord, LinkRecord};
use crate::model::views::Backlink;
use crate::repo::{offset_from_db, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const NOTE_SELECT_SQL: &str = "SELECT
    note_id,
    path,
    title,
    created_at,
    modified_at,
    word_count,
    metadata
FROM notes";

/// Repository interface the query layer reads through.
pub trait NoteQueryRepository {
    /// Gets one note by identity.
    fn get_note(&self, note_id: &str) -> RepoResult<Option<NoteRecord>>;
    /// Lists headings of one note in offset order.
    fn list_headings(&self, note_id: &str) -> RepoResult<Vec<HeadingRecord>>;
    /// Lists outbound links of one note in insertion order.
    fn list_outbound_links(&self, note_id: &str) -> RepoResult<Vec<LinkRecord>>;
    /// Lists links whose destination is any of `targets`.
    fn list_backlinks(&self, targets: &[String]) -> RepoResult<Vec<Backlink>>;
    /// Lists chunks of one note in offset order.
    fn list_chunks(&self, note_id: &str) -> RepoResult<Vec<ChunkRecord>>;
    /// Lists the `limit` most recently modified notes.
    fn list_recent_notes(&self, limit: u32) -> RepoResult<Vec<NoteRecord>>;
    /// Lists every link with at least `min_occurrences` mentions.
    fn list_edges(&self, min_occurrences: u32) -> RepoResult<Vec<LinkRecord>>;
}

/// SQLite-backed read repository.
pub struct SqliteQueryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteQueryRepository<'conn> {
    /// Constructs a repository over a connection already known to be migrated.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NoteQueryRepository for SqliteQueryRepository<'_> {
    fn get_note(&self, note_id: &str) -> RepoResult<Option<NoteRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE note_id = ?1;"))?;
        let mut rows = stmt.query([note_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn list_headings(&self, note_id: &str) -> RepoResult<Vec<HeadingRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, note_id, heading, level, start_offset
             FROM headings
             WHERE note_id = ?1
             ORDER BY start_offset ASC, id ASC;",
        )?;
        let mut rows = stmt.query([note_id])?;
        let mut headings = Vec::new();
        while let Some(row) = rows.next()? {
            headings.push(HeadingRecord {
                id: row.get("id")?,
                note_id: row.get("note_id")?,
                text: row.get("heading")?,
                level: row.get("level")?,
                start_offset: offset_from_db(row.get("start_offset")?, "headings.start_offset")?,
            });
        }
        Ok(headings)
    }

    fn list_outbound_links(&self, note_id: &str) -> RepoResult<Vec<LinkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT src_note, dst_note, link_text, occurrences
             FROM links
             WHERE src_note = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([note_id])?;
        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            links.push(parse_link_row(row)?);
        }
        Ok(links)
    }

    fn list_backlinks(&self, targets: &[String]) -> RepoResult<Vec<Backlink>> {
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; targets.len()].join(", ");
        let sql = format!(
            "SELECT
                l.src_note AS src_note,
                l.link_text AS link_text,
                l.occurrences AS occurrences,
                n.title AS title,
                n.path AS path
             FROM links l
             LEFT JOIN notes n ON l.src_note = n.note_id
             WHERE l.dst_note IN ({placeholders})
             ORDER BY l.occurrences DESC, n.modified_at DESC, l.src_note ASC;"
        );
        let bind_values = targets.iter().map(|target| Value::Text(target.clone()));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut backlinks = Vec::new();
        while let Some(row) = rows.next()? {
            backlinks.push(Backlink {
                src_note: row.get("src_note")?,
                src_title: row.get("title")?,
                src_path: row.get("path")?,
                link_text: row.get("link_text")?,
                occurrences: row.get("occurrences")?,
            });
        }
        Ok(backlinks)
    }

    fn list_chunks(&self, note_id: &str) -> RepoResult<Vec<ChunkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT chunk_id, note_id, heading_id, start_offset, end_offset, text
             FROM chunks
             WHERE note_id = ?1
             ORDER BY start_offset ASC;",
        )?;
        let mut rows = stmt.query([note_id])?;
        let mut chunks = Vec::new();
        while let Some(row) = rows.next()? {
            chunks.push(ChunkRecord {
                chunk_id: row.get("chunk_id")?,
                note_id: row.get("note_id")?,
                heading_id: row.get("heading_id")?,
                start_offset: offset_from_db(row.get("start_offset")?, "chunks.start_offset")?,
                end_offset: offset_from_db(row.get("end_offset")?, "chunks.end_offset")?,
                text: row.get("text")?,
            });
        }
        Ok(chunks)
    }

    fn list_recent_notes(&self, limit: u32) -> RepoResult<Vec<NoteRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL} ORDER BY modified_at DESC, note_id ASC LIMIT ?1;"
        ))?;
        let mut rows = stmt.query(params![i64::from(limit)])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn list_edges(&self, min_occurrences: u32) -> RepoResult<Vec<LinkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT src_note, dst_note, link_text, occurrences
             FROM links
             WHERE occurrences >= ?1
             ORDER BY src_note ASC, id ASC;",
        )?;
        let mut rows = stmt.query(params![min_occurrences])?;
        let mut edges = Vec::new();
        while let Some(row) = rows.next()? {
            edges.push(parse_link_row(row)?);
        }
        Ok(edges)
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<NoteRecord> {
    let note_id: String = row.get("note_id")?;
    let metadata_text: String = row.get("metadata")?;
    let metadata: NoteMetadata = serde_json::from_str(&metadata_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid metadata for `{note_id}` in notes.metadata: {err}"
        ))
    })?;

    Ok(NoteRecord {
        path: row.get("path")?,
        title: row.get("title")?,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
        word_count: row.get("word_count")?,
        metadata,
        note_id,
    })
}

fn parse_link_row(row: &Row<'_>) -> RepoResult<LinkRecord> {
    Ok(LinkRecord {
        src_note: row.get("src_note")?,
        dst_note: row.get("dst_note")?,
        link_text: row.get("link_text")?,
        occurrences: row.get("occurrences")?,
    })
}
