//! Rendering annotations as markdown
//!
//! Turns an [`AnnotationRecord`] into the single-line markdown fragment that
//! represents it in the target document, and groups rendered annotations by
//! document title for the reconciler.

use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::identity::IdDeriver;
use crate::links::{LinkError, LinkScheme, LinkTarget};
use crate::markdown::{escape_comments, managed_line};
use crate::models::AnnotationRecord;

/// An annotation with its identity and rendered link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedAnnotation {
    pub record: AnnotationRecord,
    pub id: String,
    pub link: String,
}

impl RenderedAnnotation {
    /// The full list item written to the target document
    pub fn managed_line(&self) -> String {
        managed_line(&self.link, &self.id)
    }
}

/// Annotations belonging to one source document, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentGroup {
    pub title: String,
    pub annotations: Vec<RenderedAnnotation>,
}

impl DocumentGroup {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            annotations: Vec::new(),
        }
    }
}

/// Derives IDs and link text for annotations
pub struct Renderer<'a> {
    ids: &'a IdDeriver,
    links: &'a dyn LinkScheme,
    placeholder: &'a str,
}

impl<'a> Renderer<'a> {
    pub fn new(ids: &'a IdDeriver, links: &'a dyn LinkScheme, placeholder: &'a str) -> Self {
        Self {
            ids,
            links,
            placeholder,
        }
    }

    /// Render one annotation of the document titled `doc_title` whose PDF
    /// lives at `document`.
    ///
    /// A link that cannot be built leaves the locator empty; the error is
    /// returned alongside so the caller can report it.
    pub fn render(
        &self,
        record: AnnotationRecord,
        doc_title: &str,
        document: &Path,
    ) -> (RenderedAnnotation, Option<LinkError>) {
        let id = self.ids.derive(&record, doc_title);

        let target = LinkTarget {
            document,
            page: record.page,
            annotation_id: &id,
            rect: record.rect.as_deref(),
            color: None,
        };
        let (locator, error) = match self.links.locator(&target) {
            Ok(locator) => (locator, None),
            Err(e) => {
                warn!(id = %id, "{}", e);
                (String::new(), Some(e))
            }
        };

        let link = self.link_text(&record, doc_title, &locator);
        (RenderedAnnotation { record, id, link }, error)
    }

    /// `**Kind** "text" (Title, [p. N](locator))`
    fn link_text(&self, record: &AnnotationRecord, doc_title: &str, locator: &str) -> String {
        let text = if record.text.is_empty() {
            self.placeholder
        } else {
            record.text.as_str()
        };
        let text = escape_comments(&text.split_whitespace().collect::<Vec<_>>().join(" "));

        let page = if locator.is_empty() {
            format!("p. {}", record.page)
        } else {
            format!("[p. {}]({})", record.page, locator)
        };

        format!(
            "**{}** \"{}\" ({}, {})",
            record.kind,
            text,
            escape_comments(doc_title.trim()),
            page
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::FallbackId;
    use crate::links::{NoLinks, ViewRectLinks};
    use crate::models::AnnotationKind;

    fn highlight() -> AnnotationRecord {
        let mut record = AnnotationRecord::new(AnnotationKind::Highlight, "Key point")
            .with_raw_page(Some("2".to_string()));
        record.name = Some("a1".to_string());
        record.rect = Some("1,2,3,4".to_string());
        record
    }

    #[cfg(unix)]
    #[test]
    fn test_render_with_link() {
        let ids = IdDeriver::new(FallbackId::Timestamp);
        let renderer = Renderer::new(&ids, &ViewRectLinks, "(no text)");

        let (rendered, error) =
            renderer.render(highlight(), "Physiology", Path::new("/docs/Physiology.pdf"));

        assert!(error.is_none());
        assert_eq!(rendered.id, "a1");
        assert_eq!(
            rendered.link,
            "**Highlight** \"Key point\" (Physiology, [p. 3](file:///docs/Physiology.pdf#page=3&viewrect=1,2,3,4))"
        );
        assert_eq!(
            rendered.managed_line(),
            format!("- {} <!--a1 -->[tag:: ]", rendered.link)
        );
    }

    #[test]
    fn test_render_without_locator() {
        let ids = IdDeriver::new(FallbackId::Timestamp);
        let renderer = Renderer::new(&ids, &NoLinks, "(no text)");

        let (rendered, error) = renderer.render(highlight(), "Physiology", Path::new("x.pdf"));

        assert!(error.is_none());
        assert_eq!(rendered.link, "**Highlight** \"Key point\" (Physiology, p. 3)");
    }

    #[test]
    fn test_empty_text_uses_placeholder() {
        let ids = IdDeriver::new(FallbackId::Timestamp);
        let renderer = Renderer::new(&ids, &NoLinks, "(kein Text)");

        let mut record = highlight();
        record.text.clear();
        let (rendered, _) = renderer.render(record, "Physiology", Path::new("x.pdf"));

        assert!(rendered.link.contains("\"(kein Text)\""));
    }

    #[test]
    fn test_comment_delimiters_in_text_are_broken_up() {
        let ids = IdDeriver::new(FallbackId::Timestamp);
        let renderer = Renderer::new(&ids, &NoLinks, "(no text)");

        let mut record = highlight();
        record.text = "see <!-- note --> here".to_string();
        let (rendered, _) = renderer.render(record, "Physiology", Path::new("x.pdf"));

        assert_eq!(
            rendered.link,
            "**Highlight** \"see <!- - note - -> here\" (Physiology, p. 3)"
        );
        assert_eq!(crate::markdown::extract_id(&rendered.managed_line()), Some("a1"));
    }

    #[test]
    fn test_unresolvable_document_leaves_locator_empty() {
        let ids = IdDeriver::new(FallbackId::Timestamp);
        let renderer = Renderer::new(&ids, &ViewRectLinks, "(no text)");

        let (rendered, error) =
            renderer.render(highlight(), "Physiology", Path::new("relative.pdf"));

        assert!(matches!(error, Some(LinkError::MissingLinkTarget { .. })));
        assert!(rendered.link.ends_with("(Physiology, p. 3)"));
    }
}
