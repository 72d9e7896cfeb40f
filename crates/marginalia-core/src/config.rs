//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/marginalia/config.toml)
//! 3. Environment variables (MARGINALIA_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::FallbackId;
use crate::links::LinkStyle;

/// Environment variable prefix
const ENV_PREFIX: &str = "MARGINALIA";

/// A setting value that is not one of the accepted choices
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid value '{value}' for {key}. Expected one of: {expected}")]
pub struct InvalidSetting {
    pub key: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Heading depth used for sections created by a sync run (1-3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HeaderLevel(u8);

impl HeaderLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 3;

    pub fn get(self) -> u8 {
        self.0
    }

    /// Markdown heading prefix, e.g. `##`
    pub fn marker(self) -> String {
        "#".repeat(self.0 as usize)
    }
}

impl Default for HeaderLevel {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u8> for HeaderLevel {
    type Error = String;

    fn try_from(level: u8) -> std::result::Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(format!(
                "header_level must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                level
            ))
        }
    }
}

impl From<HeaderLevel> for u8 {
    fn from(level: HeaderLevel) -> Self {
        level.0
    }
}

impl fmt::Display for HeaderLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory scanned for `*.xfdf` files
    #[serde(default = "default_xfdf_folder")]
    pub xfdf_folder: PathBuf,

    /// Markdown document annotations are merged into
    #[serde(default = "default_target_file")]
    pub target_file: PathBuf,

    /// Heading level for newly created document sections
    #[serde(default)]
    pub header_level: HeaderLevel,

    /// Descend into subdirectories of `xfdf_folder`
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// How to identify annotations that carry no `name`
    #[serde(default)]
    pub fallback_id: FallbackId,

    /// Which kind of viewer link to render
    #[serde(default)]
    pub link_style: LinkStyle,

    /// Root folder of the PDFs, mirroring `xfdf_folder`.
    /// When unset the PDF is expected next to its XFDF file.
    #[serde(default)]
    pub pdf_folder: Option<PathBuf>,

    /// Shown in place of annotation text when there is none
    #[serde(default = "default_placeholder")]
    pub empty_text_placeholder: String,

    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            xfdf_folder: default_xfdf_folder(),
            target_file: default_target_file(),
            header_level: HeaderLevel::default(),
            recursive: true,
            fallback_id: FallbackId::default(),
            link_style: LinkStyle::default(),
            pdf_folder: None,
            empty_text_placeholder: default_placeholder(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (MARGINALIA_XFDF_FOLDER, MARGINALIA_TARGET_FILE,
    ///    MARGINALIA_HEADER_LEVEL)
    /// 2. Config file (~/.config/marginalia/config.toml or MARGINALIA_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // MARGINALIA_XFDF_FOLDER
        if let Ok(val) = std::env::var(format!("{}_XFDF_FOLDER", ENV_PREFIX)) {
            self.xfdf_folder = PathBuf::from(val);
        }

        // MARGINALIA_TARGET_FILE
        if let Ok(val) = std::env::var(format!("{}_TARGET_FILE", ENV_PREFIX)) {
            self.target_file = PathBuf::from(val);
        }

        // MARGINALIA_HEADER_LEVEL
        if let Ok(val) = std::env::var(format!("{}_HEADER_LEVEL", ENV_PREFIX)) {
            self.header_level = parse_header_level(&val)?;
        }

        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Set a single key from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional_path = |v: &str| (!v.is_empty() && v != "none").then(|| PathBuf::from(v));

        match key {
            "xfdf_folder" => self.xfdf_folder = value.into(),
            "target_file" => self.target_file = value.into(),
            "header_level" => self.header_level = parse_header_level(value)?,
            "recursive" => {
                self.recursive = value
                    .parse()
                    .context("Invalid value for recursive. Use 'true' or 'false'.")?;
            }
            "fallback_id" => self.fallback_id = value.parse()?,
            "link_style" => self.link_style = value.parse()?,
            "pdf_folder" => self.pdf_folder = optional_path(value),
            "empty_text_placeholder" => self.empty_text_placeholder = value.to_string(),
            "log_file" => self.log_file = optional_path(value),
            _ => bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                Self::KEYS.join(", ")
            ),
        }
        Ok(())
    }

    pub const KEYS: &'static [&'static str] = &[
        "xfdf_folder",
        "target_file",
        "header_level",
        "recursive",
        "fallback_id",
        "link_style",
        "pdf_folder",
        "empty_text_placeholder",
        "log_file",
    ];

    /// Get the config file path
    ///
    /// Can be overridden with MARGINALIA_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("marginalia")
            .join("config.toml")
    }
}

fn parse_header_level(value: &str) -> Result<HeaderLevel> {
    let level: u8 = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid header level: '{}'", value))?;
    HeaderLevel::try_from(level).map_err(anyhow::Error::msg)
}

fn default_xfdf_folder() -> PathBuf {
    documents_dir().join("Annotations")
}

fn default_target_file() -> PathBuf {
    documents_dir().join("Annotations.md")
}

fn documents_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_placeholder() -> String {
    "(no text)".to_string()
}

fn default_true() -> bool {
    true
}
