//! Marginalia CLI
//!
//! Command-line interface for Marginalia - PDF annotations into markdown.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use marginalia_core::Config;

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "marginalia")]
#[command(about = "Marginalia - Sync PDF annotations into a markdown document")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge XFDF annotations into the target document (default)
    Sync {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the annotations of a single XFDF file
    Parse {
        /// XFDF file to read
        file: PathBuf,
        /// Document title (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (xfdf_folder, target_file, header_level, recursive,
        /// fallback_id, link_style, pdf_folder, empty_text_placeholder, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands must work even when the config file is broken
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    match cli.command.unwrap_or(Commands::Sync { dry_run: false }) {
        Commands::Sync { dry_run } => {
            commands::sync::sync(&config, dry_run, &output).await?;
        }
        Commands::Parse { file, title } => {
            commands::parse::parse(&config, &file, title, &output).await?;
        }
        Commands::Config { .. } => unreachable!(), // Handled above
    }

    Ok(())
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// The level comes from MARGINALIA_LOG, else from the -v count. Without
/// either, nothing is logged. Logs go to stderr unless `log_file` is set.
fn init_logging(config: &Config, verbose: u8) {
    let log_level = match std::env::var("MARGINALIA_LOG") {
        Ok(level) => level,
        Err(_) => match verbose {
            0 => return,
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        },
    };

    let env_filter = EnvFilter::new(format!(
        "marginalia_core={},marginalia_cli={}",
        log_level, log_level
    ));

    let Some(log_path) = &config.log_file else {
        // Ignore error if already initialized
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        return;
    };

    let log_file = match File::create(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    tracing::info!("Logging initialized to {:?}", log_path);
}
