//! Config command - configuration management

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use sniq_core::config::Config;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::args::config_candidates;

/// Config command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Write a configuration file with every default spelled out
    Init {
        /// Output file path
        #[arg(short, long, default_value = "sniqueue.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file and its domain list
    Validate {
        /// Config file to validate (default: the effective configuration)
        file: Option<PathBuf>,
    },

    /// Show config file locations
    Paths,
}

/// Execute config command
pub fn execute(args: ConfigArgs, config: &Config) -> Result<()> {
    match args.action {
        ConfigAction::Show => show_config(config),
        ConfigAction::Init { output, force } => init_config(&output, force),
        ConfigAction::Validate { file } => match file {
            Some(path) => {
                let config = Config::load(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?;
                validate_config(&config)
            }
            None => validate_config(config),
        },
        ConfigAction::Paths => {
            show_paths();
            Ok(())
        }
    }
}

fn show_config(config: &Config) -> Result<()> {
    let toml_str = config.to_toml().context("Failed to serialize config")?;
    println!("{toml_str}");
    Ok(())
}

fn template() -> Result<String> {
    let toml_str = Config::default()
        .to_toml()
        .context("Failed to serialize config")?;

    Ok(format!(
        "# sniqueue configuration\n\
         #\n\
         # Route traffic into the queue with e.g.\n\
         #   nft add rule inet filter output tcp dport 443 queue num 100 bypass\n\
         #   nft add rule inet filter output udp dport 443 queue num 100 bypass\n\
         #\n\
         # [policy] drop = true discards matched packets; otherwise matched\n\
         # packets are accepted with `mark`.\n\
         # [domains] file = \"/etc/sniqueue/domains.txt\" loads one domain per\n\
         # line; \"*.example.com\" matches subdomains only.\n\n\
         {toml_str}"
    ))
}

fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists, use --force to overwrite",
            output.display()
        );
    }

    std::fs::write(output, template()?)
        .with_context(|| format!("Failed to write config to {}", output.display()))?;

    info!("Generated config file: {}", output.display());
    println!("Configuration file generated: {}", output.display());
    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    config
        .validate()
        .context("Configuration validation failed")?;

    let list = config.domains.list();
    let trie = config
        .domains
        .load_trie(list.as_ref())
        .context("Failed to load domain list")?;

    println!("{} Configuration is valid", "✓".green());
    println!(
        "  Queues: {}-{}",
        config.queue.number,
        config.queue.numbers().last().unwrap_or(config.queue.number)
    );
    println!("  Verdict: {}", config.policy());
    match list {
        Some(list) => println!("  Domain list: {}", list.path().display()),
        None => println!("  Domain list: {}", "none".dimmed()),
    }
    println!("  Domains: {}", trie.len());
    match config.domains.reload_interval() {
        Some(interval) => println!("  Reload: every {}s", interval.as_secs()),
        None => println!("  Reload: {}", "disabled".dimmed()),
    }

    Ok(())
}

fn show_paths() {
    println!("Configuration file search paths:");
    println!();

    for (i, path) in config_candidates().iter().enumerate() {
        let marker = if path.exists() {
            "✓".green()
        } else {
            "✗".red()
        };
        println!("  {}. {} {}", i + 1, marker, path.display());
    }

    println!();
    println!("Override with --config or SNIQUEUE_CONFIG.");
}
