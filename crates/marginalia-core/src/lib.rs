//! Marginalia Core Library
//!
//! This crate provides the core functionality for Marginalia, which pulls
//! PDF annotations out of XFDF exports and keeps them in a single markdown
//! document, one section per PDF.
//!
//! # Architecture
//!
//! - **Extraction**: XFDF files are parsed into [`AnnotationRecord`]s
//! - **Rendering**: each record becomes one list item carrying its ID in an
//!   HTML comment
//! - **Reconciliation**: rendered items are merged into the document by ID,
//!   so repeated runs are idempotent and the user's own lines survive
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let scheme = config.link_style.scheme();
//! let report = Synchronizer::new(&config, scheme.as_ref(), &LogNotifier)
//!     .run(RunMode::Write)
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - `xfdf`: XFDF parsing
//! - `models`: Annotation records and kinds
//! - `identity`: Stable annotation IDs
//! - `links`: Viewer link schemes
//! - `render`: Markdown rendering of annotations
//! - `markdown`: Line classification for the target document
//! - `reconcile`: Three-way merge into the target document
//! - `persistence`: Reading and atomically writing the target document
//! - `sync`: Orchestration of a full run (main entry point)
//! - `config`: Application configuration

pub mod config;
pub mod entities;
pub mod error;
pub mod identity;
pub mod links;
pub mod markdown;
pub mod models;
pub mod persistence;
pub mod reconcile;
pub mod render;
pub mod sync;
pub mod xfdf;

pub use config::{Config, HeaderLevel, InvalidSetting};
pub use error::{SyncError, SyncResult};
pub use identity::{FallbackId, IdDeriver};
pub use links::{LinkError, LinkScheme, LinkStyle};
pub use models::{AnnotationKind, AnnotationRecord};
pub use reconcile::{Reconciler, SyncStats};
pub use render::{DocumentGroup, RenderedAnnotation, Renderer};
pub use sync::{LogNotifier, NoticeLevel, Notifier, RunMode, SyncReport, Synchronizer};
pub use xfdf::{parse_xfdf, XfdfError};
