//! Merging annotations into the target document
//!
//! The target document is a hand-edited markdown file. Each source document
//! owns a section introduced by a heading whose text is the document title.
//! Synced annotations are list items tagged with an ID comment (see
//! [`crate::markdown`]); everything else belongs to the user.
//!
//! A single left-to-right pass over the existing lines:
//!
//! - lines outside any section are copied through;
//! - a heading whose text is a document title opens that document's section,
//!   which runs until the next heading of the same or a higher level (fewer
//!   or equal `#`); deeper headings are part of the section;
//! - inside a section of a known document, a line whose ID matches a current
//!   annotation is kept verbatim if its link text is unchanged and replaced
//!   otherwise; every other line is kept verbatim, including lines for
//!   annotations that no longer exist in the source;
//! - annotations not yet present are inserted at the end of their section,
//!   before any trailing blank lines.
//!
//! Documents with no heading at all get a new section appended to the end.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::config::HeaderLevel;
use crate::markdown::{classify, header_line, managed_core, LineKind};
use crate::render::{DocumentGroup, RenderedAnnotation};

/// Per-run annotation counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SyncStats {
    /// Whether the document needs to be written back
    pub fn has_changes(&self) -> bool {
        self.new + self.updated > 0
    }
}

/// Result of merging annotations into a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub lines: Vec<String>,
    pub stats: SyncStats,
    /// Titles of sections appended at the end of the document
    pub new_sections: Vec<String>,
}

/// Merges document groups into an existing line sequence
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    header_level: HeaderLevel,
}

impl Reconciler {
    /// `header_level` is used for sections created for previously unseen documents
    pub fn new(header_level: HeaderLevel) -> Self {
        Self { header_level }
    }

    pub fn reconcile(&self, lines: &[String], groups: &[DocumentGroup]) -> Reconciliation {
        // Heading titles are read trimmed, so group titles are matched trimmed too
        let by_title: HashMap<&str, &DocumentGroup> =
            groups.iter().map(|g| (g.title.trim(), g)).collect();

        let mut state = State::default();
        let mut i = 0;

        while i < lines.len() {
            let line = &lines[i];
            i += 1;

            let LineKind::Header { level, title } = classify(line) else {
                state.out.push(line.clone());
                continue;
            };

            state.out.push(line.clone());
            state.visited.insert(title.to_string());

            // Headings of other documents keep scanning so nested sections are found
            let Some(group) = by_title.get(title) else {
                continue;
            };

            let end = section_end(lines, i, level);
            state.merge_section(group, &lines[i..end]);
            i = end;
        }

        for group in groups {
            if state.visited.contains(group.title.trim()) || group.annotations.is_empty() {
                continue;
            }
            state.append_section(self.header_level, group);
        }

        Reconciliation {
            lines: state.out,
            stats: state.stats,
            new_sections: state.new_sections,
        }
    }
}

/// Index of the first heading at `level` or above, starting at `from`
fn section_end(lines: &[String], from: usize, level: usize) -> usize {
    lines[from..]
        .iter()
        .position(|line| matches!(classify(line), LineKind::Header { level: l, .. } if l <= level))
        .map_or(lines.len(), |offset| from + offset)
}

#[derive(Default)]
struct State {
    out: Vec<String>,
    stats: SyncStats,
    visited: HashSet<String>,
    /// IDs written so far, per document title
    seen: HashMap<String, HashSet<String>>,
    new_sections: Vec<String>,
}

impl State {
    fn merge_section(&mut self, group: &DocumentGroup, body: &[String]) {
        let current: HashMap<&str, &RenderedAnnotation> = group
            .annotations
            .iter()
            .map(|a| (a.id.as_str(), a))
            .collect();
        let seen = self.seen.entry(group.title.trim().to_string()).or_default();

        for line in body {
            let LineKind::Managed { id } = classify(line) else {
                self.out.push(line.clone());
                continue;
            };

            let first_occurrence = seen.insert(id.to_string());
            match current.get(id) {
                Some(annotation) if first_occurrence => {
                    let fresh = annotation.managed_line();
                    if managed_core(line) == managed_core(&fresh) {
                        self.stats.unchanged += 1;
                        self.out.push(line.clone());
                    } else {
                        debug!(id = %id, title = %group.title, "Annotation changed");
                        self.stats.updated += 1;
                        self.out.push(fresh);
                    }
                }
                _ => self.out.push(line.clone()),
            }
        }

        let missing: Vec<String> = group
            .annotations
            .iter()
            .filter(|a| seen.insert(a.id.clone()))
            .map(RenderedAnnotation::managed_line)
            .collect();
        if missing.is_empty() {
            return;
        }

        debug!(count = missing.len(), title = %group.title, "Adding annotations to section");
        self.stats.new += missing.len();

        let trailing_blank = self
            .out
            .iter()
            .rev()
            .take(body.len())
            .take_while(|l| l.trim().is_empty())
            .count();
        let at = self.out.len() - trailing_blank;
        self.out.splice(at..at, missing);
    }

    fn append_section(&mut self, level: HeaderLevel, group: &DocumentGroup) {
        debug!(title = %group.title, "Creating section");

        if self.out.last().is_some_and(|l| !l.trim().is_empty()) {
            self.out.push(String::new());
        }
        self.out.push(header_line(level, &group.title));

        let seen = self.seen.entry(group.title.trim().to_string()).or_default();
        for annotation in &group.annotations {
            if seen.insert(annotation.id.clone()) {
                self.out.push(annotation.managed_line());
                self.stats.new += 1;
            }
        }

        self.visited.insert(group.title.trim().to_string());
        self.new_sections.push(group.title.trim().to_string());
    }
}
