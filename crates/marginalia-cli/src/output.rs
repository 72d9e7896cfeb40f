//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use marginalia_core::{NoticeLevel, Notifier, RenderedAnnotation, SyncReport};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print the outcome of a sync run
    pub fn print_report(&self, report: &SyncReport) {
        match self.format {
            OutputFormat::Human => {
                for skipped in &report.files_skipped {
                    println!("Skipped {}: {}", skipped.path.display(), skipped.reason);
                }
                for title in &report.new_sections {
                    println!("New section: {}", title);
                }
                println!(
                    "{} file(s) scanned, {} document(s)",
                    report.files_scanned, report.documents
                );

                let summary = report.summary();
                if report.dry_run {
                    println!("{} (dry run, nothing written)", summary);
                } else if report.written {
                    println!("✓ {} -> {}", summary, report.target.display());
                } else {
                    println!("{}", summary);
                }
            }
            OutputFormat::Json => {
                print_json(report);
            }
            OutputFormat::Quiet => {
                if report.written {
                    println!("{}", report.target.display());
                }
            }
        }
    }

    /// Print the annotations parsed from one XFDF file
    pub fn print_annotations(&self, title: &str, annotations: &[RenderedAnnotation]) {
        match self.format {
            OutputFormat::Human => {
                if annotations.is_empty() {
                    println!("No annotations found.");
                    return;
                }
                println!("── {} ──", title);
                for annotation in annotations {
                    let record = &annotation.record;
                    println!(
                        "p. {:<4} {:<10} {:<20} {}",
                        record.page,
                        record.kind.to_string(),
                        truncate(&annotation.id, 20),
                        truncate(&record.text, 50)
                    );
                }
                println!("\n{} annotation(s)", annotations.len());
            }
            OutputFormat::Json => {
                print_json(annotations);
            }
            OutputFormat::Quiet => {
                for annotation in annotations {
                    println!("{}", annotation.record.to_snapshot_line());
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr; kept even in quiet mode
    pub fn warn(&self, msg: &str) {
        match self.format {
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({"status": "warning", "message": msg})
                );
            }
            _ => eprintln!("Warning: {}", msg),
        }
    }
}

/// Warnings go to stderr as they happen. Info notices are left to the
/// final report so they are not printed twice.
impl Notifier for Output {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Warning => self.warn(message),
            NoticeLevel::Info => tracing::debug!("{}", message),
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
