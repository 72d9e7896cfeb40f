//! Sync command handler

use anyhow::{Context, Result};

use marginalia_core::{Config, RunMode, SyncReport, Synchronizer};

use crate::output::Output;

/// Merge the annotations of every XFDF file into the target document
pub async fn sync(config: &Config, dry_run: bool, output: &Output) -> Result<SyncReport> {
    let mode = if dry_run {
        RunMode::DryRun
    } else {
        RunMode::Write
    };

    tracing::info!(
        source = %config.xfdf_folder.display(),
        target = %config.target_file.display(),
        dry_run,
        "Starting sync"
    );

    let scheme = config.link_style.scheme();
    let result = Synchronizer::new(config, scheme.as_ref(), output)
        .run(mode)
        .await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if let Some(hint) = e.recovery_suggestion() {
                output.warn(hint);
            }
            return Err(e).context("Sync failed");
        }
    };

    output.print_report(&report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let xfdf_folder = dir.path().join("xfdf");
        std::fs::create_dir_all(&xfdf_folder).unwrap();
        Config {
            xfdf_folder,
            target_file: dir.path().join("notes.md"),
            link_style: marginalia_core::LinkStyle::None,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_sync_writes_target() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);
        std::fs::write(
            config.xfdf_folder.join("Physiology.xfdf"),
            r#"<xfdf><annots><highlight name="a1" page="0"><contents-richtext><body><span>Key point</span></body></contents-richtext></highlight></annots></xfdf>"#,
        )
        .unwrap();
        let output = Output::new(OutputFormat::Quiet);

        let report = sync(&config, false, &output).await.unwrap();

        assert!(report.written);
        let content = std::fs::read_to_string(&config.target_file).unwrap();
        assert!(content.starts_with("# Physiology\n"));
        assert!(content.contains("<!--a1 -->"));
    }

    #[tokio::test]
    async fn test_sync_missing_folder_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(&temp_dir);
        config.xfdf_folder = temp_dir.path().join("missing");
        let output = Output::new(OutputFormat::Quiet);

        let error = sync(&config, false, &output).await.unwrap_err();

        assert!(format!("{:#}", error).contains("XFDF folder not found"));
    }
}
