//! CLI argument definitions for the manifest binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Config file used when neither `--config` nor `MANIFEST_CONFIG` is set.
pub const DEFAULT_CONFIG_FILE: &str = "manifest.toml";

/// Manifest: ask questions about the passenger dataset.
#[derive(Parser, Debug)]
#[command(name = "manifest", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the query service.
    Serve {
        /// Listen port.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,

        /// Path to the dataset CSV file.
        #[arg(short = 'd', long = "dataset")]
        dataset: Option<PathBuf>,
    },
    /// Start an interactive chat against a running query service.
    Chat {
        /// Full URL of the query endpoint.
        #[arg(short = 'u', long = "url")]
        url: Option<String>,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > MANIFEST_CONFIG env var > ./manifest.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("MANIFEST_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Resolve the query service port.
    ///
    /// Priority: --port flag > MANIFEST_PORT env var > config file value > 8000.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Command::Serve { port: Some(p), .. } = self.command {
            return p;
        }
        if let Ok(val) = std::env::var("MANIFEST_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        if config_port != 0 {
            return config_port;
        }
        8000
    }

    /// Resolve the dataset path.
    ///
    /// Priority: --dataset flag > config file value.
    pub fn resolve_dataset(&self, config_path: &str) -> PathBuf {
        match &self.command {
            Command::Serve {
                dataset: Some(p), ..
            } => p.clone(),
            _ => PathBuf::from(config_path),
        }
    }

    /// Resolve the query endpoint URL.
    ///
    /// Priority: --url flag > config file value.
    pub fn resolve_url(&self, config_url: &str) -> String {
        match &self.command {
            Command::Chat { url: Some(u) } => u.clone(),
            _ => config_url.to_string(),
        }
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// One line read at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Blank,
    Exit,
    /// The line exactly as typed.
    Question(&'a str),
}

/// Classify a prompt line. Only blank lines and `exit` are special.
pub fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Input::Blank
    } else if trimmed.eq_ignore_ascii_case("exit") {
        Input::Exit
    } else {
        Input::Question(line)
    }
}
