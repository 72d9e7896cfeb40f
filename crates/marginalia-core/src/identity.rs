//! Annotation identity
//!
//! Every synced annotation is tagged in the markdown document with an ID so
//! later runs can find the line again. The authoring application's `name`
//! attribute is used when present. Otherwise a fallback is generated
//! according to [`FallbackId`].

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::InvalidSetting;
use crate::models::AnnotationRecord;

/// Hex digits kept from the content hash
const HASH_LEN: usize = 16;

/// Strategy for annotations without a `name` attribute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackId {
    /// `<title>-<unix nanos>`. A new ID is produced on every run, so such
    /// annotations are appended again each time.
    #[default]
    Timestamp,
    /// Hash of type, page, rect and text. Stable across runs as long as the
    /// annotation is unchanged.
    ContentHash,
}

impl FallbackId {
    const EXPECTED: &'static str = "timestamp, content-hash";

    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackId::Timestamp => "timestamp",
            FallbackId::ContentHash => "content-hash",
        }
    }
}

impl fmt::Display for FallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FallbackId {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timestamp" => Ok(FallbackId::Timestamp),
            "content-hash" => Ok(FallbackId::ContentHash),
            _ => Err(InvalidSetting {
                key: "fallback_id",
                value: s.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

/// Derives the unique ID of each annotation
#[derive(Debug)]
pub struct IdDeriver {
    fallback: FallbackId,
    last_nanos: AtomicI64,
}

impl IdDeriver {
    pub fn new(fallback: FallbackId) -> Self {
        Self {
            fallback,
            last_nanos: AtomicI64::new(0),
        }
    }

    /// The record's `name` if non-empty, otherwise a fallback ID
    pub fn derive(&self, record: &AnnotationRecord, doc_title: &str) -> String {
        if let Some(name) = record.name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return name.to_string();
            }
        }

        match self.fallback {
            FallbackId::Timestamp => format!("{}-{}", slug(doc_title), self.next_nanos()),
            FallbackId::ContentHash => content_hash(record),
        }
    }

    /// Current time in nanoseconds, strictly increasing across calls
    fn next_nanos(&self) -> i64 {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let next = now.max(self.last_nanos.load(Ordering::Relaxed) + 1);
        self.last_nanos.store(next, Ordering::Relaxed);
        next
    }
}

/// `h-` followed by a truncated SHA-256 of the annotation's content
pub fn content_hash(record: &AnnotationRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.kind.tag().as_bytes());
    hasher.update(b"|");
    hasher.update(record.page.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(record.rect.as_deref().unwrap_or_default().as_bytes());
    hasher.update(b"|");
    hasher.update(record.text.as_bytes());

    let digest = hex::encode(hasher.finalize());
    format!("h-{}", &digest[..HASH_LEN])
}

/// Reduce a document title to characters safe inside an HTML comment
fn slug(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "annotation".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnnotationKind;

    fn record(name: Option<&str>) -> AnnotationRecord {
        let mut record = AnnotationRecord::new(AnnotationKind::Highlight, "Key point")
            .with_raw_page(Some("2".to_string()));
        record.name = name.map(str::to_string);
        record.rect = Some("1,2,3,4".to_string());
        record
    }

    #[test]
    fn test_name_is_authoritative() {
        let deriver = IdDeriver::new(FallbackId::ContentHash);
        assert_eq!(deriver.derive(&record(Some("a1")), "Physiology"), "a1");
    }

    #[test]
    fn test_blank_name_falls_back() {
        let deriver = IdDeriver::new(FallbackId::ContentHash);
        let id = deriver.derive(&record(Some("  ")), "Physiology");
        assert!(id.starts_with("h-"));
    }

    #[test]
    fn test_timestamp_fallback_is_unique() {
        let deriver = IdDeriver::new(FallbackId::Timestamp);
        let first = deriver.derive(&record(None), "Cell Biology");
        let second = deriver.derive(&record(None), "Cell Biology");

        assert!(first.starts_with("Cell-Biology-"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_content_hash_is_stable() {
        let deriver = IdDeriver::new(FallbackId::ContentHash);
        let first = deriver.derive(&record(None), "Physiology");
        let second = IdDeriver::new(FallbackId::ContentHash).derive(&record(None), "Physiology");

        assert_eq!(first, second);
        assert_eq!(first.len(), 2 + HASH_LEN);
    }

    #[test]
    fn test_content_hash_tracks_content() {
        let mut changed = record(None);
        changed.text = "Other point".to_string();
        assert_ne!(content_hash(&record(None)), content_hash(&changed));
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Cell Biology (2nd ed.)"), "Cell-Biology--2nd-ed");
        assert_eq!(slug("--"), "annotation");
    }

    #[test]
    fn test_fallback_from_str() {
        assert_eq!("timestamp".parse::<FallbackId>(), Ok(FallbackId::Timestamp));
        assert_eq!("content-hash".parse::<FallbackId>(), Ok(FallbackId::ContentHash));
        assert!("uuid".parse::<FallbackId>().is_err());
    }
}
