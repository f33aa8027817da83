//! Wikilink extraction, candidate ranking, and per-destination aggregation.
//!
//! # Responsibility
//! - Find `[[target]]` / `[[target|alias]]` tokens in document order.
//! - Rank stored notes that could be the target of a raw link string.
//! - Fold repeated mentions of one destination into a single counted edge.
//!
//! # Invariants
//! - Matching is case-sensitive and exact; there is no fuzzy fallback.
//! - An unresolved target is kept verbatim as a forward reference.
//! - The first occurrence of a destination fixes its display text.

use crate::model::note::{note_file_name, note_file_stem};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static WIKILINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[([^\]|]+)(\|([^\]]+))?\]\]").expect("valid wikilink regex")
});

/// One wikilink token as written in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wikilink<'a> {
    /// Trimmed raw target.
    pub target: &'a str,
    /// Trimmed alias, when present and not blank.
    pub alias: Option<&'a str>,
}

impl<'a> Wikilink<'a> {
    /// Alias when present, else the raw target.
    pub fn display_text(&self) -> &'a str {
        self.alias.unwrap_or(self.target)
    }
}

/// Scans a body for wikilinks. Tokens with a blank target are skipped.
pub fn scan_wikilinks(body: &str) -> Vec<Wikilink<'_>> {
    WIKILINK_RE
        .captures_iter(body)
        .filter_map(|caps| {
            let target = caps.get(1)?.as_str().trim();
            if target.is_empty() {
                return None;
            }
            let alias = caps
                .get(3)
                .map(|alias| alias.as_str().trim())
                .filter(|alias| !alias.is_empty());
            Some(Wikilink { target, alias })
        })
        .collect()
}

/// Stored note that may be the destination of a link target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    pub path: String,
    pub title: String,
}

/// How a candidate matched a link target. Declaration order is priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchKind {
    /// `[[Title]]` equals the note title.
    Title,
    /// `[[dir/Note.md]]` equals the full path.
    Path,
    /// `[[Note]]` equals the file name without its extension, whatever it is.
    FileStem,
    /// `[[Note.md]]` equals the file name.
    FileName,
}

/// Candidate that matched, with the strongest way it matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCandidate {
    pub path: String,
    pub kind: MatchKind,
}

/// Returns the strongest way `candidate` matches `target`, if any.
pub fn match_kind(target: &str, candidate: &LinkCandidate) -> Option<MatchKind> {
    if candidate.title == target {
        Some(MatchKind::Title)
    } else if candidate.path == target {
        Some(MatchKind::Path)
    } else if note_file_stem(&candidate.path) == target {
        Some(MatchKind::FileStem)
    } else if note_file_name(&candidate.path) == target {
        Some(MatchKind::FileName)
    } else {
        None
    }
}

/// Ranks candidates for `target`, best first.
///
/// Non-matching candidates are dropped. Ties within one match kind are broken
/// by path so the result does not depend on store row order.
pub fn rank_candidates(target: &str, candidates: &[LinkCandidate]) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .filter_map(|candidate| {
            match_kind(target, candidate).map(|kind| RankedCandidate {
                path: candidate.path.clone(),
                kind,
            })
        })
        .collect();
    ranked.sort_by(|left, right| {
        left.kind
            .cmp(&right.kind)
            .then_with(|| left.path.cmp(&right.path))
    });
    ranked
}

/// Resolves `target` to the best candidate path, or returns it unchanged.
pub fn resolve_target(target: &str, candidates: &[LinkCandidate]) -> String {
    rank_candidates(target, candidates)
        .into_iter()
        .next()
        .map(|best| best.path)
        .unwrap_or_else(|| target.to_string())
}

/// Outbound edge aggregated over all mentions of one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub dst_note: String,
    pub link_text: String,
    pub occurrences: u32,
}

/// Extracts wikilinks from `body` and folds them by resolved destination.
///
/// `resolve` is called at most once per distinct raw target. Edges are
/// returned in order of first mention.
pub fn collect_links<E>(
    body: &str,
    mut resolve: impl FnMut(&str) -> Result<String, E>,
) -> Result<Vec<ResolvedLink>, E> {
    let mut resolved_targets: HashMap<&str, String> = HashMap::new();
    let mut slot_by_destination: HashMap<String, usize> = HashMap::new();
    let mut links: Vec<ResolvedLink> = Vec::new();

    for wikilink in scan_wikilinks(body) {
        let destination = match resolved_targets.get(wikilink.target) {
            Some(destination) => destination.clone(),
            None => {
                let destination = resolve(wikilink.target)?;
                resolved_targets.insert(wikilink.target, destination.clone());
                destination
            }
        };

        match slot_by_destination.get(&destination) {
            Some(&slot) => links[slot].occurrences += 1,
            None => {
                slot_by_destination.insert(destination.clone(), links.len());
                links.push(ResolvedLink {
                    dst_note: destination,
                    link_text: wikilink.display_text().to_string(),
                    occurrences: 1,
                });
            }
        }
    }

    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::{
        collect_links, rank_candidates, resolve_target, scan_wikilinks, LinkCandidate, MatchKind,
    };
    use std::convert::Infallible;

    fn candidate(path: &str, title: &str) -> LinkCandidate {
        LinkCandidate {
            path: path.to_string(),
            title: title.to_string(),
        }
    }

    fn identity(target: &str) -> Result<String, Infallible> {
        Ok(target.to_string())
    }

    #[test]
    fn scan_reads_targets_and_aliases() {
        let links = scan_wikilinks("see [[ Alpha ]] and [[beta|The Beta]] [[ |x]]");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].target, "Alpha");
        assert_eq!(links[0].alias, None);
        assert_eq!(links[1].target, "beta");
        assert_eq!(links[1].alias, Some("The Beta"));
        assert_eq!(links[1].display_text(), "The Beta");
    }

    #[test]
    fn scan_ignores_unclosed_and_single_brackets() {
        assert!(scan_wikilinks("[single] [[never closed").is_empty());
        assert!(scan_wikilinks("[[a]b]]").is_empty());
    }

    #[test]
    fn blank_alias_falls_back_to_target() {
        let links = scan_wikilinks("[[Gamma|   ]]");
        assert_eq!(links[0].display_text(), "Gamma");
    }

    #[test]
    fn ranking_prefers_title_then_path_then_stem_then_file_name() {
        let candidates = vec![
            candidate("z/B.md.md", "other"),
            candidate("y/B.md", "other"),
            candidate("B.md", "other"),
            candidate("x/note.md", "B.md"),
        ];

        let ranked = rank_candidates("B.md", &candidates);
        let kinds: Vec<_> = ranked.iter().map(|entry| entry.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MatchKind::Title,
                MatchKind::Path,
                MatchKind::FileStem,
                MatchKind::FileName
            ]
        );
        assert_eq!(ranked[0].path, "x/note.md");
        assert_eq!(ranked[1].path, "B.md");
        assert_eq!(ranked[2].path, "z/B.md.md");
        assert_eq!(ranked[3].path, "y/B.md");
    }

    #[test]
    fn ranking_breaks_ties_by_path() {
        let candidates = vec![candidate("b/Topic.md", "b"), candidate("a/Topic.md", "a")];
        assert_eq!(resolve_target("Topic", &candidates), "a/Topic.md");
    }

    #[test]
    fn file_stem_matches_any_extension() {
        let candidates = vec![candidate("y/B.md", "y"), candidate("x/B.txt", "x")];
        assert_eq!(resolve_target("B", &candidates), "x/B.txt");
    }

    #[test]
    fn matching_is_case_sensitive() {
        let candidates = vec![candidate("notes/topic.md", "topic")];
        assert_eq!(resolve_target("Topic", &candidates), "Topic");
    }

    #[test]
    fn unresolved_target_is_returned_verbatim() {
        assert_eq!(resolve_target("Missing Note", &[]), "Missing Note");
    }

    #[test]
    fn repeated_destination_counts_and_keeps_first_display_text() {
        let links =
            collect_links("[[Target]] then [[Target|Alias]] and [[Other]]", identity).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].dst_note, "Target");
        assert_eq!(links[0].link_text, "Target");
        assert_eq!(links[0].occurrences, 2);
        assert_eq!(links[1].dst_note, "Other");
        assert_eq!(links[1].occurrences, 1);
    }

    #[test]
    fn different_targets_resolving_to_one_note_share_an_edge() {
        let links = collect_links("[[B|first]] [[notes/b.md]] [[b]]", |target| {
            Ok::<_, Infallible>(match target {
                "B" | "b" | "notes/b.md" => "notes/b.md".to_string(),
                other => other.to_string(),
            })
        })
        .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].dst_note, "notes/b.md");
        assert_eq!(links[0].link_text, "first");
        assert_eq!(links[0].occurrences, 3);
    }

    #[test]
    fn resolver_runs_once_per_distinct_target() {
        let mut calls = Vec::new();
        collect_links("[[A]] [[A]] [[B]] [[A|x]]", |target| {
            calls.push(target.to_string());
            Ok::<_, Infallible>(target.to_string())
        })
        .unwrap();
        assert_eq!(calls, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn resolver_errors_propagate() {
        let result = collect_links("[[A]]", |_| Err::<String, _>("store down"));
        assert_eq!(result.unwrap_err(), "store down");
    }
}
