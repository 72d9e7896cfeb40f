//! Sync orchestration
//!
//! One run: find the XFDF files, parse them, group annotations by document
//! title, merge them into the target document and write it back if anything
//! changed. Files that cannot be read or parsed are skipped and reported;
//! only a missing XFDF folder or a failure to read or write the target
//! document aborts the run.

use std::path::{Path, PathBuf};

use futures_util::future::join_all;
use serde::Serialize;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use crate::identity::IdDeriver;
use crate::links::{pdf_path_for, LinkScheme};
use crate::models::AnnotationRecord;
use crate::persistence::TargetDocument;
use crate::reconcile::{Reconciler, SyncStats};
use crate::render::{DocumentGroup, Renderer};
use crate::xfdf::parse_xfdf;

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// Sink for user-facing status messages
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Notifier that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => info!("{}", message),
            NoticeLevel::Warning => warn!("{}", message),
        }
    }
}

/// Whether a run may modify the target document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Write,
    /// Compute everything, write nothing
    DryRun,
}

/// A source file that contributed nothing to the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub target: PathBuf,
    pub files_scanned: usize,
    pub files_skipped: Vec<SkippedFile>,
    pub documents: usize,
    pub stats: SyncStats,
    pub new_sections: Vec<String>,
    /// Annotations rendered without a viewer link
    pub missing_links: usize,
    pub written: bool,
    pub dry_run: bool,
}

impl SyncReport {
    /// One-line summary shown after each run
    pub fn summary(&self) -> String {
        if !self.stats.has_changes() {
            return format!("No changes ({} unchanged)", self.stats.unchanged);
        }
        format!(
            "{} new, {} updated, {} unchanged",
            self.stats.new, self.stats.updated, self.stats.unchanged
        )
    }
}

/// Runs the annotation sync for one configuration
pub struct Synchronizer<'a> {
    config: &'a Config,
    links: &'a dyn LinkScheme,
    notifier: &'a dyn Notifier,
}

impl<'a> Synchronizer<'a> {
    pub fn new(config: &'a Config, links: &'a dyn LinkScheme, notifier: &'a dyn Notifier) -> Self {
        Self {
            config,
            links,
            notifier,
        }
    }

    pub async fn run(&self, mode: RunMode) -> SyncResult<SyncReport> {
        let source = &self.config.xfdf_folder;
        let target = TargetDocument::new(&self.config.target_file);

        let mut report = SyncReport {
            target: target.path().to_path_buf(),
            dry_run: mode == RunMode::DryRun,
            ..SyncReport::default()
        };

        let files = collect_xfdf_files(source, self.config.recursive).await?;
        report.files_scanned = files.len();
        info!("Found {} XFDF file(s) in {:?}", files.len(), source);

        let parsed = self.parse_all(&files, &mut report.files_skipped).await;
        let groups = self.render_groups(parsed, &mut report.missing_links);
        report.documents = groups.len();

        if report.missing_links > 0 {
            self.notifier.notify(
                NoticeLevel::Warning,
                &format!(
                    "Could not build viewer links for {} annotation(s); they were written without links",
                    report.missing_links
                ),
            );
        }

        if mode == RunMode::Write {
            target.ensure_exists().await?;
        }
        let text = target.read_lines().await?;

        let reconciliation =
            Reconciler::new(self.config.header_level).reconcile(&text.lines, &groups);
        report.stats = reconciliation.stats;
        report.new_sections = reconciliation.new_sections;

        if reconciliation.stats.has_changes() && mode == RunMode::Write {
            target
                .write_lines(&reconciliation.lines, text.format)
                .await?;
            report.written = true;
            info!("Wrote {:?}", target.path());
        } else {
            debug!("Target document left untouched");
        }

        self.notifier.notify(NoticeLevel::Info, &report.summary());
        Ok(report)
    }

    /// Read every file concurrently, then parse them in path order
    async fn parse_all(
        &self,
        files: &[PathBuf],
        skipped: &mut Vec<SkippedFile>,
    ) -> Vec<(PathBuf, Vec<AnnotationRecord>)> {
        let contents = join_all(files.iter().map(|path| async move {
            (path.clone(), fs::read_to_string(path).await)
        }))
        .await;

        let mut parsed = Vec::with_capacity(contents.len());
        for (path, content) in contents {
            let result = content
                .map_err(|e| e.to_string())
                .and_then(|xml| parse_xfdf(&xml).map_err(|e| e.to_string()));

            match result {
                Ok(records) => {
                    debug!("Parsed {} annotation(s) from {:?}", records.len(), path);
                    parsed.push((path, records));
                }
                Err(reason) => {
                    warn!("Skipping {:?}: {}", path, reason);
                    self.notifier.notify(
                        NoticeLevel::Warning,
                        &format!("Skipped {}: {}", path.display(), reason),
                    );
                    skipped.push(SkippedFile { path, reason });
                }
            }
        }
        parsed
    }

    /// Group records by document title in first-seen order and render them
    fn render_groups(
        &self,
        parsed: Vec<(PathBuf, Vec<AnnotationRecord>)>,
        missing_links: &mut usize,
    ) -> Vec<DocumentGroup> {
        let ids = IdDeriver::new(self.config.fallback_id);
        let renderer = Renderer::new(&ids, self.links, &self.config.empty_text_placeholder);

        let mut groups: Vec<DocumentGroup> = Vec::new();
        for (path, records) in parsed {
            if records.is_empty() {
                continue;
            }

            let title = document_title(&path);
            let pdf = pdf_path_for(
                &path,
                &self.config.xfdf_folder,
                self.config.pdf_folder.as_deref(),
            );

            let index = match groups.iter().position(|g| g.title == title) {
                Some(index) => index,
                None => {
                    groups.push(DocumentGroup::new(title.clone()));
                    groups.len() - 1
                }
            };

            for record in records {
                let (rendered, error) = renderer.render(record, &title, &pdf);
                if error.is_some() {
                    *missing_links += 1;
                }
                groups[index].annotations.push(rendered);
            }
        }
        groups
    }
}

/// File name without extension, trimmed; the section title for the document.
/// Falls back to the whole file name when the stem is blank.
pub fn document_title(path: &Path) -> String {
    let name = |part: Option<&std::ffi::OsStr>| {
        part.map(|p| p.to_string_lossy().trim().to_string())
            .unwrap_or_default()
    };

    let stem = name(path.file_stem());
    if stem.is_empty() {
        name(path.file_name())
    } else {
        stem
    }
}

/// All `*.xfdf` files below `root`, sorted by path
pub async fn collect_xfdf_files(root: &Path, recursive: bool) -> SyncResult<Vec<PathBuf>> {
    let is_dir = fs::metadata(root)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(SyncError::SourceNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| SyncError::read(e, dir.clone()))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SyncError::read(e, dir.clone()))?
        {
            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) => {
                    warn!("Cannot stat {:?}: {}", path, e);
                    continue;
                }
            };

            if file_type.is_dir() {
                if recursive {
                    pending.push(path);
                }
            } else if is_xfdf(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

fn is_xfdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xfdf"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_document_title() {
        assert_eq!(document_title(Path::new("/x/Physiology.xfdf")), "Physiology");
        assert_eq!(
            document_title(Path::new("/x/Cell Biology.v2.xfdf")),
            "Cell Biology.v2"
        );
        assert_eq!(document_title(Path::new("/x/Doc .xfdf")), "Doc");
        assert_eq!(document_title(Path::new("/x/  Notes  .xfdf")), "Notes");
        assert_eq!(document_title(Path::new("/x/ .xfdf")), ".xfdf");
    }

    #[test]
    fn test_is_xfdf() {
        assert!(is_xfdf(Path::new("a.xfdf")));
        assert!(is_xfdf(Path::new("a.XFDF")));
        assert!(!is_xfdf(Path::new("a.pdf")));
        assert!(!is_xfdf(Path::new("xfdf")));
    }

    #[test]
    fn test_summary() {
        let mut report = SyncReport::default();
        report.stats.unchanged = 4;
        assert_eq!(report.summary(), "No changes (4 unchanged)");

        report.stats.new = 1;
        report.stats.updated = 2;
        assert_eq!(report.summary(), "1 new, 2 updated, 4 unchanged");
    }

    #[test]
    fn test_report_serializes() {
        let report = SyncReport {
            files_scanned: 2,
            files_skipped: vec![SkippedFile {
                path: PathBuf::from("/x/Broken.xfdf"),
                reason: "XML parse error".to_string(),
            }],
            new_sections: vec!["Physiology".to_string()],
            ..SyncReport::default()
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["files_scanned"], 2);
        assert_eq!(json["files_skipped"][0]["path"], "/x/Broken.xfdf");
        assert_eq!(json["stats"]["new"], 0);
        assert_eq!(json["new_sections"][0], "Physiology");
        assert_eq!(json["written"], false);
    }

    #[tokio::test]
    async fn test_collect_recursive_and_flat() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("b.xfdf"), "").unwrap();
        std::fs::write(root.join("a.XFDF"), "").unwrap();
        std::fs::write(root.join("notes.md"), "").unwrap();
        std::fs::write(root.join("sub").join("c.xfdf"), "").unwrap();

        let all = collect_xfdf_files(root, true).await.unwrap();
        assert_eq!(
            all,
            vec![
                root.join("a.XFDF"),
                root.join("b.xfdf"),
                root.join("sub").join("c.xfdf")
            ]
        );

        let flat = collect_xfdf_files(root, false).await.unwrap();
        assert_eq!(flat.len(), 2);
    }

    #[tokio::test]
    async fn test_collect_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let result = collect_xfdf_files(&temp_dir.path().join("nope"), true).await;
        assert!(matches!(result, Err(SyncError::SourceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_collect_file_is_not_a_source() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.xfdf");
        std::fs::write(&file, "").unwrap();

        let result = collect_xfdf_files(&file, true).await;
        assert!(matches!(result, Err(SyncError::SourceNotFound { .. })));
    }
}
