//! Config command handlers

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use marginalia_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        OutputFormat::Quiet => {
            println!("{}", config.target_file.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            for (key, value) in entries(&config) {
                println!("  {:<24}{}", format!("{}:", key), value);
            }
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    config.set(&key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Key/value pairs in `Config::KEYS` order, as shown to the user
fn entries(config: &Config) -> Vec<(&'static str, String)> {
    let optional = |path: Option<&Path>| {
        path.map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    };

    vec![
        ("xfdf_folder", config.xfdf_folder.display().to_string()),
        ("target_file", config.target_file.display().to_string()),
        ("header_level", config.header_level.to_string()),
        ("recursive", config.recursive.to_string()),
        ("fallback_id", config.fallback_id.to_string()),
        ("link_style", config.link_style.to_string()),
        ("pdf_folder", optional(config.pdf_folder.as_deref())),
        (
            "empty_text_placeholder",
            config.empty_text_placeholder.clone(),
        ),
        ("log_file", optional(config.log_file.as_deref())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_entries_follow_key_order() {
        let keys: Vec<&str> = entries(&Config::default())
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, Config::KEYS);
    }

    #[test]
    fn test_set_persists_to_given_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);

        set(
            "link_style".to_string(),
            "comment".to_string(),
            Some(&path),
            &output,
        )
        .unwrap();
        set(
            "pdf_folder".to_string(),
            "/library/pdf".to_string(),
            Some(&path),
            &output,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.link_style, marginalia_core::LinkStyle::Comment);
        assert_eq!(config.pdf_folder, Some(PathBuf::from("/library/pdf")));
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);

        assert!(set("header_level".into(), "7".into(), Some(&path), &output).is_err());
        assert!(set("sync_url".into(), "x".into(), Some(&path), &output).is_err());
        assert!(!path.exists());
    }
}
