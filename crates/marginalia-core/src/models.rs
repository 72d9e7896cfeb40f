//! Data models for Marginalia
//!
//! Defines the annotation record produced by the XFDF parser, its kind, and
//! the pipe-delimited snapshot encoding used when records are dumped for
//! inspection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder written in the snapshot color column; XFDF color is not extracted.
pub const SNAPSHOT_COLOR: &str = "undefined";

/// Number of columns in a snapshot line
const SNAPSHOT_FIELDS: usize = 7;

/// Annotation types that are synced. Anything else in `<annots>` is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Highlight,
    Squiggly,
    Underline,
    StrikeOut,
    Text,
    FreeText,
    Square,
    Circle,
    Line,
    Polygon,
    Polyline,
    Ink,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 12] = [
        AnnotationKind::Highlight,
        AnnotationKind::Squiggly,
        AnnotationKind::Underline,
        AnnotationKind::StrikeOut,
        AnnotationKind::Text,
        AnnotationKind::FreeText,
        AnnotationKind::Square,
        AnnotationKind::Circle,
        AnnotationKind::Line,
        AnnotationKind::Polygon,
        AnnotationKind::Polyline,
        AnnotationKind::Ink,
    ];

    /// Match an XFDF element name, ignoring case
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag().eq_ignore_ascii_case(tag))
    }

    /// Lowercase XFDF element name
    pub fn tag(&self) -> &'static str {
        match self {
            AnnotationKind::Highlight => "highlight",
            AnnotationKind::Squiggly => "squiggly",
            AnnotationKind::Underline => "underline",
            AnnotationKind::StrikeOut => "strikeout",
            AnnotationKind::Text => "text",
            AnnotationKind::FreeText => "freetext",
            AnnotationKind::Square => "square",
            AnnotationKind::Circle => "circle",
            AnnotationKind::Line => "line",
            AnnotationKind::Polygon => "polygon",
            AnnotationKind::Polyline => "polyline",
            AnnotationKind::Ink => "ink",
        }
    }
}

/// Title-cased tag name, e.g. `Highlight`, `Strikeout`, `Freetext`
impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.tag();
        let (first, rest) = tag.split_at(1);
        write!(f, "{}{}", first.to_ascii_uppercase(), rest)
    }
}

impl FromStr for AnnotationKind {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| SnapshotError::UnknownKind(s.to_string()))
    }
}

/// One annotation extracted from an XFDF file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub kind: AnnotationKind,
    /// Flattened rich text; may be empty when the rich-text body was missing
    pub text: String,
    /// Raw `rect` attribute
    pub rect: Option<String>,
    pub subject: Option<String>,
    /// Stable identifier assigned by the authoring application
    pub name: Option<String>,
    /// Raw 0-based `page` attribute as found in the source
    pub raw_page: Option<String>,
    /// 1-based page number
    pub page: u32,
}

impl AnnotationRecord {
    /// Create a record with only kind and text set, on page 1
    pub fn new(kind: AnnotationKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            rect: None,
            subject: None,
            name: None,
            raw_page: None,
            page: 1,
        }
    }

    /// Set the raw page attribute and derive the 1-based page number
    pub fn with_raw_page(mut self, raw_page: Option<String>) -> Self {
        self.page = page_number(raw_page.as_deref());
        self.raw_page = raw_page;
        self
    }

    /// Encode as `Type|Contents|Rect|Color|Subject|Name|Page`
    pub fn to_snapshot_line(&self) -> String {
        let fields = [
            self.kind.to_string(),
            escape_field(&self.text),
            escape_field(self.rect.as_deref().unwrap_or_default()),
            SNAPSHOT_COLOR.to_string(),
            escape_field(self.subject.as_deref().unwrap_or_default()),
            escape_field(self.name.as_deref().unwrap_or_default()),
            escape_field(self.raw_page.as_deref().unwrap_or("0")),
        ];
        fields.join("|")
    }

    /// Decode a snapshot line produced by [`AnnotationRecord::to_snapshot_line`]
    pub fn from_snapshot_line(line: &str) -> Result<Self, SnapshotError> {
        let fields = split_fields(line);
        if fields.len() != SNAPSHOT_FIELDS {
            return Err(SnapshotError::FieldCount(fields.len()));
        }

        let kind: AnnotationKind = fields[0].parse()?;
        let optional = |s: &str| (!s.is_empty()).then(|| s.to_string());

        Ok(Self {
            kind,
            text: fields[1].clone(),
            rect: optional(fields[2].as_str()),
            subject: optional(fields[4].as_str()),
            name: optional(fields[5].as_str()),
            raw_page: None,
            page: 1,
        }
        .with_raw_page(Some(fields[6].clone())))
    }
}

/// Convert a raw 0-based page attribute to a 1-based page number.
///
/// Absent or non-numeric values count as page 0.
pub fn page_number(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<u32>().ok())
        .unwrap_or(0)
        .saturating_add(1)
}

/// Errors decoding a snapshot line
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Expected 7 fields, found {0}")]
    FieldCount(usize),

    #[error("Unknown annotation type: {0}")]
    UnknownKind(String),
}

fn escape_field(value: &str) -> String {
    value.replace('\\', "\\\\").replace('|', "\\|")
}

fn split_fields(line: &str) -> Vec<String> {
    let mut fields = vec![String::new()];
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let (Some(next), Some(f)) = (chars.next(), fields.last_mut()) {
                    f.push(next);
                }
            }
            '|' => fields.push(String::new()),
            _ => {
                if let Some(f) = fields.last_mut() {
                    f.push(c);
                }
            }
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_tag_ignores_case() {
        assert_eq!(
            AnnotationKind::from_tag("HighLight"),
            Some(AnnotationKind::Highlight)
        );
        assert_eq!(
            AnnotationKind::from_tag("strikeout"),
            Some(AnnotationKind::StrikeOut)
        );
        assert_eq!(AnnotationKind::from_tag("FREETEXT"), Some(AnnotationKind::FreeText));
        assert_eq!(AnnotationKind::from_tag("stamp"), None);
        assert_eq!(AnnotationKind::from_tag("caret"), None);
    }

    #[test]
    fn test_kind_display_is_title_cased() {
        assert_eq!(AnnotationKind::Highlight.to_string(), "Highlight");
        assert_eq!(AnnotationKind::StrikeOut.to_string(), "Strikeout");
        assert_eq!(AnnotationKind::FreeText.to_string(), "Freetext");
        assert_eq!(AnnotationKind::Ink.to_string(), "Ink");
    }

    #[test]
    fn test_page_number() {
        assert_eq!(page_number(None), 1);
        assert_eq!(page_number(Some("0")), 1);
        assert_eq!(page_number(Some("2")), 3);
        assert_eq!(page_number(Some(" 4 ")), 5);
        assert_eq!(page_number(Some("abc")), 1);
    }

    #[test]
    fn test_snapshot_line_layout() {
        let mut record = AnnotationRecord::new(AnnotationKind::Highlight, "Key point")
            .with_raw_page(Some("2".to_string()));
        record.rect = Some("1,2,3,4".to_string());
        record.name = Some("a1".to_string());

        assert_eq!(
            record.to_snapshot_line(),
            "Highlight|Key point|1,2,3,4|undefined||a1|2"
        );
    }

    #[test]
    fn test_snapshot_line_absent_page_is_zero() {
        let record = AnnotationRecord::new(AnnotationKind::Text, "");
        assert_eq!(record.to_snapshot_line(), "Text|||undefined|||0");
    }

    #[test]
    fn test_snapshot_line_escapes_pipes() {
        let mut record = AnnotationRecord::new(AnnotationKind::Underline, r"a|b\c");
        record.subject = Some("x|y".to_string());

        let line = record.to_snapshot_line();
        assert_eq!(line, r"Underline|a\|b\\c||undefined|x\|y||0");

        let decoded = AnnotationRecord::from_snapshot_line(&line).unwrap();
        assert_eq!(decoded.text, r"a|b\c");
        assert_eq!(decoded.subject.as_deref(), Some("x|y"));
        assert_eq!(decoded.page, 1);
    }

    #[test]
    fn test_from_snapshot_line_rejects_bad_input() {
        assert_eq!(
            AnnotationRecord::from_snapshot_line("Highlight|text"),
            Err(SnapshotError::FieldCount(2))
        );
        assert_eq!(
            AnnotationRecord::from_snapshot_line("Stamp|||undefined|||0"),
            Err(SnapshotError::UnknownKind("Stamp".to_string()))
        );
    }
}
