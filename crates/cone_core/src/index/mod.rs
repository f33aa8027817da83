//! Pure note-body analysis used by the index pipeline.
//!
//! # Responsibility
//! - Locate lines and paragraphs with stable offsets.
//! - Extract headings, wikilinks, and retrieval chunks from one body.
//! - Rank link-resolution candidates without touching storage.
//!
//! # Invariants
//! - Every function here is deterministic for a given input.
//! - Offsets are UTF-8 byte offsets into the original body.

pub mod chunker;
pub mod headings;
pub mod links;
pub mod offsets;
