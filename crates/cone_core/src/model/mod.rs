//! Domain model for indexed notes and their derived rows.
//!
//! # Responsibility
//! - Define the note record and its path-derived identity helpers.
//! - Define derived rows (headings, links, chunks) and read-side views.
//!
//! # Invariants
//! - A note is identified by its normalized path (`note_id == path`).
//! - Derived rows never outlive the index pass that produced them.

pub mod note;
pub mod rows;
pub mod views;
