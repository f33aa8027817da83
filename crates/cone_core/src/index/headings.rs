//! Heading extraction and title derivation.
//!
//! # Invariants
//! - Headings are returned in document order with strictly increasing offsets.
//! - A heading offset points at the untrimmed line start, not at the `#`.

use crate::index::offsets::lines;
use crate::model::note::note_file_stem;
use crate::model::rows::Heading;
use once_cell::sync::Lazy;
use regex::Regex;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid heading regex"));

/// Extracts all heading lines from a note body.
pub fn extract_headings(body: &str) -> Vec<Heading> {
    lines(body)
        .filter_map(|line| {
            let (level, text) = parse_heading_line(line.text)?;
            Some(Heading {
                text,
                level,
                start_offset: line.start,
            })
        })
        .collect()
}

/// Derives a note title: first level-1 heading, else the path's file stem.
pub fn derive_title(path: &str, headings: &[Heading]) -> String {
    headings
        .iter()
        .find(|heading| heading.level == 1)
        .map(|heading| heading.text.clone())
        .unwrap_or_else(|| note_file_stem(path).to_string())
}

fn parse_heading_line(line: &str) -> Option<(u8, String)> {
    let caps = HEADING_RE.captures(line.trim())?;
    let level = u8::try_from(caps.get(1)?.as_str().len()).ok()?;
    let text = caps.get(2)?.as_str().trim();
    if text.is_empty() {
        return None;
    }
    Some((level, text.to_string()))
}
