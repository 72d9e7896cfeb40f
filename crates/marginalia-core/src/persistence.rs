//! Target document persistence
//!
//! Reads the markdown document as lines and writes it back using atomic
//! writes (write to temp file, then rename) so an interrupted run never
//! leaves a half-written document behind. The document's line ending and
//! final newline are written back as they were found.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// The markdown document annotations are merged into
#[derive(Debug, Clone)]
pub struct TargetDocument {
    path: PathBuf,
}

impl TargetDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document as lines, with the line format it uses.
    ///
    /// A missing document reads as empty.
    pub async fn read_lines(&self) -> SyncResult<DocumentText> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(DocumentText::parse(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DocumentText::default()),
            Err(e) => Err(SyncError::read(e, self.path.clone())),
        }
    }

    /// Create the document empty if it does not exist yet
    pub async fn ensure_exists(&self) -> SyncResult<()> {
        if fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }
        debug!("Creating empty target document {:?}", self.path);
        atomic_write(&self.path, b"").await
    }

    /// Replace the document with the given lines in the given format
    pub async fn write_lines(&self, lines: &[String], format: LineFormat) -> SyncResult<()> {
        atomic_write(&self.path, format.join(lines).as_bytes()).await
    }
}

/// Line ending and final newline of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFormat {
    pub ending: &'static str,
    pub final_newline: bool,
}

impl Default for LineFormat {
    fn default() -> Self {
        Self {
            ending: "\n",
            final_newline: true,
        }
    }
}

impl LineFormat {
    /// The format of existing text. The first line break decides the
    /// ending; empty text gets the default.
    pub fn detect(content: &str) -> Self {
        if content.is_empty() {
            return Self::default();
        }

        let ending = match content.find('\n') {
            Some(i) if content[..i].ends_with('\r') => "\r\n",
            _ => "\n",
        };
        Self {
            ending,
            final_newline: content.ends_with('\n'),
        }
    }

    /// Join lines with this format's ending
    pub fn join(&self, lines: &[String]) -> String {
        if lines.is_empty() {
            return String::new();
        }
        let mut content = lines.join(self.ending);
        if self.final_newline {
            content.push_str(self.ending);
        }
        content
    }
}

/// A document split into lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentText {
    pub lines: Vec<String>,
    pub format: LineFormat,
}

impl DocumentText {
    pub fn parse(content: &str) -> Self {
        Self {
            lines: split_lines(content),
            format: LineFormat::detect(content),
        }
    }
}

/// Split text into lines, accepting `\n` and `\r\n`
pub fn split_lines(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
async fn atomic_write(path: &Path, data: &[u8]) -> SyncResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| SyncError::from_io(e, parent.to_path_buf()))?;
    }

    let temp_path = temp_path_for(path);

    let mut file = fs::File::create(&temp_path)
        .await
        .map_err(|e| SyncError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .await
        .map_err(|e| SyncError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .await
        .map_err(|e| SyncError::from_io(e, temp_path.clone()))?;
    drop(file);

    fs::rename(&temp_path, path)
        .await
        .map_err(|source| SyncError::AtomicWriteFailed {
            from: temp_path,
            to: path.to_path_buf(),
            source,
        })?;

    Ok(())
}

/// `notes.md` -> `notes.md.tmp`, keeping the file extension visible
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
