//! Parse command handler

use std::path::Path;

use anyhow::{Context, Result};

use marginalia_core::links::pdf_path_for;
use marginalia_core::sync::document_title;
use marginalia_core::{parse_xfdf, Config, IdDeriver, RenderedAnnotation, Renderer};

use crate::output::Output;

/// Show what a single XFDF file contributes to the target document
pub async fn parse(
    config: &Config,
    file: &Path,
    title: Option<String>,
    output: &Output,
) -> Result<Vec<RenderedAnnotation>> {
    let xml = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {:?}", file))?;
    let records = parse_xfdf(&xml).with_context(|| format!("Failed to parse {:?}", file))?;

    let title = title.unwrap_or_else(|| document_title(file));
    let pdf = pdf_path_for(file, &config.xfdf_folder, config.pdf_folder.as_deref());

    let ids = IdDeriver::new(config.fallback_id);
    let scheme = config.link_style.scheme();
    let renderer = Renderer::new(&ids, scheme.as_ref(), &config.empty_text_placeholder);

    let annotations: Vec<RenderedAnnotation> = records
        .into_iter()
        .map(|record| {
            let (rendered, error) = renderer.render(record, &title, &pdf);
            if let Some(e) = error {
                output.warn(&e.to_string());
            }
            rendered
        })
        .collect();

    output.print_annotations(&title, &annotations);
    Ok(annotations)
}
