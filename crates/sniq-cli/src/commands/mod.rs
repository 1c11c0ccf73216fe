//! CLI commands

pub mod check;
pub mod classify;
pub mod completions;
pub mod config;
pub mod run;

use anyhow::{Context, Result};
use clap::Subcommand;
use sniq_core::config::DomainsConfig;
use sniq_core::DomainTrie;
use std::path::PathBuf;

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Filter packets from the netfilter queue (main command)
    Run(run::RunArgs),

    /// Check domains against the domain list
    Check(check::CheckArgs),

    /// Decode and classify a single hex-encoded packet
    Classify(classify::ClassifyArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Build the domain trie from `[domains]`, with an optional list file
/// taking the place of the configured one
pub fn load_domains(domains: &DomainsConfig, file: Option<PathBuf>) -> Result<DomainTrie> {
    let mut domains = domains.clone();
    if let Some(file) = file {
        domains.file = Some(file);
    }
    let list = domains.list();
    domains
        .load_trie(list.as_ref())
        .context("Failed to load domain list")
}
