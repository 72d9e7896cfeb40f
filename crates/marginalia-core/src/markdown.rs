//! Markdown line classification
//!
//! The reconciler only needs to know three things about a line: whether it
//! is a heading, whether it carries an annotation ID comment, or neither.
//! The ID comment looks like `<!--ID -->`; whitespace around the ID is
//! tolerated when reading. When a line holds several comments, the last one
//! carries the ID.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::HeaderLevel;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#+)[ \t]+(\S.*?)\s*$").unwrap());

/// Group 1 is everything before the last ID comment, group 2 the ID
static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)<!--\s*(.*?\S)\s*-->").unwrap());

/// Empty tag slot appended to every synced line
pub const TAG_SLOT: &str = "[tag:: ]";

/// What a line of the target document is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `#`-style heading
    Header { level: usize, title: &'a str },
    /// A line carrying an annotation ID comment
    Managed { id: &'a str },
    /// Anything else
    Plain,
}

/// Classify a line. Headings win over ID comments.
pub fn classify(line: &str) -> LineKind<'_> {
    if let Some(caps) = HEADER_RE.captures(line) {
        if let (Some(marks), Some(title)) = (caps.get(1), caps.get(2)) {
            return LineKind::Header {
                level: marks.as_str().len(),
                title: title.as_str(),
            };
        }
    }

    match extract_id(line) {
        Some(id) => LineKind::Managed { id },
        None => LineKind::Plain,
    }
}

/// The annotation ID embedded in a line, if any
pub fn extract_id(line: &str) -> Option<&str> {
    ID_RE
        .captures(line)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
}

/// `- <link> <!--<id> -->[tag:: ]`
pub fn managed_line(link: &str, id: &str) -> String {
    format!("- {} <!--{} -->{}", link, id, TAG_SLOT)
}

/// Heading line for a newly created section
pub fn header_line(level: HeaderLevel, title: &str) -> String {
    format!("{} {}", level.marker(), title.trim())
}

/// Break up comment delimiters in text that ends up on a synced line
pub fn escape_comments(text: &str) -> String {
    text.replace("<!--", "<!- -").replace("-->", "- ->")
}

/// The part of a synced line that is compared between runs.
///
/// This is the link text plus the ID comment in canonical form; the list
/// marker, whitespace inside the comment and anything the user typed after
/// the comment (tags, notes) are ignored.
pub fn managed_core(line: &str) -> Option<String> {
    let caps = ID_RE.captures(line)?;
    let before = caps.get(1)?.as_str().trim();
    let id = caps.get(2)?.as_str();

    let before = before
        .strip_prefix("- ")
        .or_else(|| before.strip_prefix("* "))
        .unwrap_or(before)
        .trim();

    Some(format!("{} <!--{} -->", before, id))
}
