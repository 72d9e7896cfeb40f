//! Sync error handling
//!
//! Provides typed errors for run-level failures with descriptive messages
//! and recovery suggestions. Per-file problems (unreadable or malformed
//! XFDF, unresolvable links) never surface here; they are reported and the
//! run continues.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a sync run
#[derive(Error, Debug)]
pub enum SyncError {
    /// The configured XFDF folder is missing or not a directory
    #[error("XFDF folder not found: '{path}'")]
    SourceNotFound { path: PathBuf },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Atomic write failed during rename
    #[error("Atomic write failed: could not rename '{from}' to '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    /// Create an error from a failed write, classified by its kind
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => SyncError::PermissionDenied {
                path,
                source: error,
            },
            _ if is_disk_full_error(&error) => SyncError::DiskFull {
                path,
                source: error,
            },
            _ => SyncError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Create an error from a failed read
    pub fn read(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => SyncError::PermissionDenied {
                path,
                source: error,
            },
            _ => SyncError::ReadError {
                path,
                source: error,
            },
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            SyncError::SourceNotFound { .. } => Some(
                "Point xfdf_folder at an existing directory: marginalia config set xfdf_folder <path>",
            ),
            SyncError::DiskFull { .. } => Some("Free up disk space and try again."),
            SyncError::PermissionDenied { .. } => {
                Some("Check file and directory permissions of the target document and its folder.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
