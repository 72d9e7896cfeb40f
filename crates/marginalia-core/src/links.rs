//! Viewer links
//!
//! Each synced line carries a link that opens the source PDF at the
//! annotation. Links are `file://` URLs with PDF open-parameter fragments
//! (`#page=N&viewrect=...` or `#page=N&comment=...`), which most desktop
//! viewers understand.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::InvalidSetting;

/// Errors producing a link
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LinkError {
    /// The document path cannot be turned into a local file URL
    #[error("Cannot build a link to '{path}': not a local absolute path")]
    MissingLinkTarget { path: PathBuf },
}

/// Everything a link scheme may address
#[derive(Debug, Clone, Copy)]
pub struct LinkTarget<'a> {
    pub document: &'a Path,
    /// 1-based page number
    pub page: u32,
    pub annotation_id: &'a str,
    pub rect: Option<&'a str>,
    pub color: Option<&'a str>,
}

/// Produces the locator string embedded in a synced line
pub trait LinkScheme: Send + Sync {
    fn locator(&self, target: &LinkTarget<'_>) -> Result<String, LinkError>;
}

/// Link style chosen in the configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStyle {
    /// Page plus annotation rectangle
    #[default]
    ViewRect,
    /// Page plus annotation ID
    Comment,
    /// No links
    None,
}

impl LinkStyle {
    const EXPECTED: &'static str = "view-rect, comment, none";

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStyle::ViewRect => "view-rect",
            LinkStyle::Comment => "comment",
            LinkStyle::None => "none",
        }
    }

    /// Build the scheme implementing this style
    pub fn scheme(&self) -> Box<dyn LinkScheme> {
        match self {
            LinkStyle::ViewRect => Box::new(ViewRectLinks),
            LinkStyle::Comment => Box::new(CommentLinks),
            LinkStyle::None => Box::new(NoLinks),
        }
    }
}

impl fmt::Display for LinkStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkStyle {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view-rect" => Ok(LinkStyle::ViewRect),
            "comment" => Ok(LinkStyle::Comment),
            "none" => Ok(LinkStyle::None),
            _ => Err(InvalidSetting {
                key: "link_style",
                value: s.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

/// `file:///doc.pdf#page=N&viewrect=<rect>[&color=<color>]`
#[derive(Debug, Default, Clone, Copy)]
pub struct ViewRectLinks;

impl LinkScheme for ViewRectLinks {
    fn locator(&self, target: &LinkTarget<'_>) -> Result<String, LinkError> {
        let mut url = file_url(target.document)?;
        let mut fragment = format!("page={}", target.page);
        if let Some(rect) = target.rect.filter(|r| !r.is_empty()) {
            fragment.push_str(&format!("&viewrect={}", rect));
        }
        if let Some(color) = target.color.filter(|c| !c.is_empty()) {
            fragment.push_str(&format!("&color={}", color));
        }
        url.set_fragment(Some(&fragment));
        Ok(url.to_string())
    }
}

/// `file:///doc.pdf#page=N&comment=<id>`
#[derive(Debug, Default, Clone, Copy)]
pub struct CommentLinks;

impl LinkScheme for CommentLinks {
    fn locator(&self, target: &LinkTarget<'_>) -> Result<String, LinkError> {
        let mut url = file_url(target.document)?;
        url.set_fragment(Some(&format!(
            "page={}&comment={}",
            target.page, target.annotation_id
        )));
        Ok(url.to_string())
    }
}

/// Always produces an empty locator
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLinks;

impl LinkScheme for NoLinks {
    fn locator(&self, _target: &LinkTarget<'_>) -> Result<String, LinkError> {
        Ok(String::new())
    }
}

fn file_url(path: &Path) -> Result<Url, LinkError> {
    Url::from_file_path(path).map_err(|_| LinkError::MissingLinkTarget {
        path: path.to_path_buf(),
    })
}

/// Locate the PDF belonging to an XFDF file.
///
/// With a `pdf_root`, the XFDF's position below `xfdf_root` is mirrored
/// below `pdf_root`; otherwise the PDF sits next to the XFDF file.
/// Relative results are resolved against the current directory when possible.
pub fn pdf_path_for(xfdf_path: &Path, xfdf_root: &Path, pdf_root: Option<&Path>) -> PathBuf {
    let pdf = xfdf_path.with_extension("pdf");
    let pdf = match pdf_root {
        Some(root) => match pdf.strip_prefix(xfdf_root) {
            Ok(relative) => root.join(relative),
            Err(_) => root.join(pdf.file_name().unwrap_or_default()),
        },
        None => pdf,
    };

    if pdf.is_absolute() {
        return pdf;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&pdf))
        .unwrap_or(pdf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target<'a>(document: &'a Path, rect: Option<&'a str>) -> LinkTarget<'a> {
        LinkTarget {
            document,
            page: 3,
            annotation_id: "a1",
            rect,
            color: None,
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_view_rect_link() {
        let path = Path::new("/papers/Cell Biology.pdf");
        let link = ViewRectLinks.locator(&target(path, Some("1,2,3,4"))).unwrap();
        assert_eq!(
            link,
            "file:///papers/Cell%20Biology.pdf#page=3&viewrect=1,2,3,4"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_view_rect_link_without_rect() {
        let path = Path::new("/papers/Physiology.pdf");
        let link = ViewRectLinks.locator(&target(path, None)).unwrap();
        assert_eq!(link, "file:///papers/Physiology.pdf#page=3");
    }

    #[cfg(unix)]
    #[test]
    fn test_comment_link() {
        let path = Path::new("/papers/Physiology.pdf");
        let link = CommentLinks.locator(&target(path, None)).unwrap();
        assert_eq!(link, "file:///papers/Physiology.pdf#page=3&comment=a1");
    }

    #[test]
    fn test_relative_path_is_missing_target() {
        let path = Path::new("relative/Physiology.pdf");
        let err = ViewRectLinks.locator(&target(path, None)).unwrap_err();
        assert!(matches!(err, LinkError::MissingLinkTarget { .. }));
    }

    #[test]
    fn test_no_links() {
        let path = Path::new("relative.pdf");
        assert_eq!(NoLinks.locator(&target(path, None)).unwrap(), "");
    }

    #[test]
    fn test_pdf_next_to_xfdf() {
        let pdf = pdf_path_for(
            Path::new("/notes/xfdf/bio/Physiology.xfdf"),
            Path::new("/notes/xfdf"),
            None,
        );
        assert_eq!(pdf, PathBuf::from("/notes/xfdf/bio/Physiology.pdf"));
    }

    #[test]
    fn test_pdf_root_mirrors_layout() {
        let pdf = pdf_path_for(
            Path::new("/notes/xfdf/bio/Physiology.xfdf"),
            Path::new("/notes/xfdf"),
            Some(Path::new("/library")),
        );
        assert_eq!(pdf, PathBuf::from("/library/bio/Physiology.pdf"));
    }

    #[test]
    fn test_link_style_from_str() {
        assert_eq!("comment".parse::<LinkStyle>(), Ok(LinkStyle::Comment));
        assert_eq!(LinkStyle::ViewRect.to_string(), "view-rect");
        assert!("obsidian".parse::<LinkStyle>().is_err());
    }
}
