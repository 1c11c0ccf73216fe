//! Command-line argument parsing

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sniq_core::config::{self, Config};
use std::path::PathBuf;

use crate::commands::Command;

/// sniqueue - SNI firewall for netfilter queues
///
/// Reads packets from NFQUEUE, extracts the server name from TLS and QUIC
/// ClientHellos and drops or marks packets whose name is on the domain list.
#[derive(Parser, Debug)]
#[command(name = "sniqueue")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", global = true, env = "SNIQUEUE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for logs
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormat>,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// Compact format
    Compact,
}

impl From<LogFormat> for config::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Text => config::LogFormat::Text,
            LogFormat::Json => config::LogFormat::Json,
            LogFormat::Compact => config::LogFormat::Compact,
        }
    }
}

impl Args {
    /// Load the configuration named by `--config`, or the first one found in
    /// the default locations, or the built-in defaults
    pub fn load_config(&self) -> Result<Config> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => match find_config_file() {
                Some(path) => path,
                None => return Ok(Config::default()),
            },
        };

        Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))
    }
}

/// Default configuration locations, most specific first
pub fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("sniqueue.toml")];
    if let Some(dirs) = directories::ProjectDirs::from("", "", "sniqueue") {
        candidates.push(dirs.config_dir().join("config.toml"));
    }
    candidates.push(PathBuf::from("/etc/sniqueue/config.toml"));
    candidates
}

fn find_config_file() -> Option<PathBuf> {
    config_candidates().into_iter().find(|path| path.exists())
}
