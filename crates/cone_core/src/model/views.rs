//! Read-side projections served to the transport boundary.

use crate::model::note::{NoteId, NoteRecord};
use crate::model::rows::{HeadingRecord, LinkRecord};
use serde::Serialize;

/// Inbound reference to a note, enriched with the linking note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backlink {
    pub src_note: NoteId,
    /// `None` when the linking note row cannot be joined.
    pub src_title: Option<String>,
    pub src_path: Option<String>,
    pub link_text: String,
    pub occurrences: u32,
}

/// Note detail view: metadata, structure, and references in both directions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteInfo {
    #[serde(flatten)]
    pub note: NoteRecord,
    /// Headings in offset order.
    pub headings: Vec<HeadingRecord>,
    /// Inbound edges, strongest first.
    pub backlinks: Vec<Backlink>,
    /// Outbound edges in insertion order.
    pub outbound_links: Vec<LinkRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: NoteId,
    pub path: String,
    pub title: String,
    pub modified_at: i64,
    pub word_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: NoteId,
    pub target: String,
    pub link_text: String,
    pub occurrences: u32,
}

/// Nodes and edges for visualization. Layout is left to the presenter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}
