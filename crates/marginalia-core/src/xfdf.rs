//! XFDF annotation parsing
//!
//! Walks the `<annots>` element of an XFDF document and produces one
//! [`AnnotationRecord`] per visible annotation of a recognised type that
//! carries rich text. Everything else is dropped silently.

use roxmltree::{Document, Node, ParsingOptions};
use thiserror::Error;
use tracing::debug;

use crate::entities::decode_entities;
use crate::models::{AnnotationKind, AnnotationRecord};

/// Errors that can occur while parsing XFDF
#[derive(Error, Debug)]
pub enum XfdfError {
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Parse XFDF text into annotation records, in document order.
///
/// A document without an `annots` element yields an empty list.
pub fn parse_xfdf(xml: &str) -> Result<Vec<AnnotationRecord>, XfdfError> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(xml, options)?;

    let Some(annots) = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name().eq_ignore_ascii_case("annots"))
    else {
        debug!("No annots element found");
        return Ok(Vec::new());
    };

    let records = annots
        .children()
        .filter(Node::is_element)
        .filter_map(|node| {
            let kind = AnnotationKind::from_tag(node.tag_name().name())?;
            parse_annotation(node, kind)
        })
        .collect();

    Ok(records)
}

fn parse_annotation(node: Node<'_, '_>, kind: AnnotationKind) -> Option<AnnotationRecord> {
    if is_hidden(node) {
        debug!(kind = %kind, "Skipping hidden annotation");
        return None;
    }

    let text = extract_text(node)?;
    let attr = |name: &str| node.attribute(name).map(str::to_string);

    let mut record = AnnotationRecord::new(kind, text).with_raw_page(attr("page"));
    record.rect = attr("rect");
    record.subject = attr("subject");
    record.name = attr("name");
    Some(record)
}

fn is_hidden(node: Node<'_, '_>) -> bool {
    node.attribute("flags")
        .is_some_and(|flags| flags.to_ascii_lowercase().contains("hidden"))
}

/// Flatten the annotation's rich text.
///
/// `None` when there is no `contents-richtext`, `Some("")` when it has no
/// `body`. Only `span` text counts.
fn extract_text(node: Node<'_, '_>) -> Option<String> {
    let richtext = find_descendant(node, "contents-richtext")?;
    let Some(body) = find_descendant(richtext, "body") else {
        return Some(String::new());
    };

    let text = outermost(body, "span")
        .into_iter()
        .map(|n| normalize(&decode_entities(&text_content(n))))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Some(text)
}

fn find_descendant<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .find(|n| n.is_element() && n.tag_name().name().eq_ignore_ascii_case(name))
}

/// Descendants named `name` that are not nested inside another `name`
fn outermost<'a, 'input>(root: Node<'a, 'input>, name: &str) -> Vec<Node<'a, 'input>> {
    let is_named =
        |n: &Node<'_, '_>| n.is_element() && n.tag_name().name().eq_ignore_ascii_case(name);

    root.descendants()
        .skip(1)
        .filter(|n| is_named(n))
        .filter(|n| {
            !n.ancestors()
                .skip(1)
                .take_while(|a| a.id() != root.id())
                .any(|a| is_named(&a))
        })
        .collect()
}

fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

/// Trim and collapse internal whitespace runs to single spaces
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
