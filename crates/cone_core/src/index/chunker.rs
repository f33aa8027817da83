//! Paragraph-packing chunker and chunk-to-heading association.
//!
//! # Responsibility
//! - Pack blank-line separated paragraphs into bounded chunks.
//! - Derive deterministic chunk ids from note identity and offset.
//! - Pick the governing heading for each chunk.
//!
//! # Invariants
//! - Chunks are ordered, non-overlapping, and each one's `end_offset` is the
//!   next chunk's `start_offset` unless a blank chunk was dropped between them.
//! - `end_offset` never exceeds the body length.
//! - Chunk text is always `body[start_offset..start_offset + text.len()]`.

use crate::index::offsets::{paragraphs, Span, PARAGRAPH_SEPARATOR};
use sha1::{Digest, Sha1};

/// Default upper bound on chunk size, in characters.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 1000;

const CHUNK_ID_HEX_LEN: usize = 16;

/// Chunk boundaries within one body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan<'a> {
    pub start_offset: usize,
    /// Offset after the last paragraph plus the separator that followed it.
    pub end_offset: usize,
    /// Paragraphs joined by their original separators.
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy)]
struct PendingChunk {
    start: usize,
    text_end: usize,
    chars: usize,
}

impl PendingChunk {
    /// Empty paragraphs never open a chunk.
    fn open(paragraph: &Span<'_>) -> Option<Self> {
        if paragraph.text.is_empty() {
            return None;
        }
        Some(Self {
            start: paragraph.start,
            text_end: paragraph.end(),
            chars: paragraph.text.chars().count(),
        })
    }
}

/// Splits `body` into chunks of at most `max_chars` characters where possible.
///
/// The limit is soft: the separator joining the next paragraph is not counted
/// when testing it, so a chunk may run up to two characters (the separator
/// width) past `max_chars`. A paragraph longer than `max_chars` becomes its own oversized
/// chunk; it is never split. Whitespace-only chunks are dropped.
pub fn split_chunks(body: &str, max_chars: usize) -> Vec<ChunkSpan<'_>> {
    let separator_chars = PARAGRAPH_SEPARATOR.chars().count();
    let mut chunks = Vec::new();
    let mut pending: Option<PendingChunk> = None;

    for paragraph in paragraphs(body) {
        let paragraph_chars = paragraph.text.chars().count();
        pending = match pending {
            Some(current) if current.chars + paragraph_chars > max_chars => {
                push_chunk(&mut chunks, body, current, paragraph.start);
                PendingChunk::open(&paragraph)
            }
            Some(current) => Some(PendingChunk {
                start: current.start,
                text_end: paragraph.end(),
                chars: current.chars + separator_chars + paragraph_chars,
            }),
            None => PendingChunk::open(&paragraph),
        };
    }

    if let Some(current) = pending {
        push_chunk(&mut chunks, body, current, body.len());
    }

    chunks
}

fn push_chunk<'a>(
    chunks: &mut Vec<ChunkSpan<'a>>,
    body: &'a str,
    pending: PendingChunk,
    end_offset: usize,
) {
    let text = &body[pending.start..pending.text_end];
    if text.trim().is_empty() {
        return;
    }
    chunks.push(ChunkSpan {
        start_offset: pending.start,
        end_offset: end_offset.min(body.len()),
        text,
    });
}

/// Returns the index of the heading governing a chunk starting at `chunk_start`.
///
/// That is the heading with the greatest offset not after the chunk start.
/// When two headings share that offset the later one in the slice wins.
pub fn nearest_heading(heading_offsets: &[usize], chunk_start: usize) -> Option<usize> {
    heading_offsets
        .iter()
        .enumerate()
        .filter(|(_, offset)| **offset <= chunk_start)
        .max_by_key(|(_, offset)| **offset)
        .map(|(index, _)| index)
}

/// Deterministic chunk id: leading hex of SHA-1 over `"{note_id}:{start_offset}"`.
pub fn chunk_id(note_id: &str, start_offset: usize) -> String {
    let digest = Sha1::digest(format!("{note_id}:{start_offset}").as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(CHUNK_ID_HEX_LEN);
    id
}
