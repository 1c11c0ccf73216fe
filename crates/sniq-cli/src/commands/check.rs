//! Check command - look up domains in the domain list

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use sniq_core::config::Config;
use std::path::PathBuf;

use super::load_domains;

/// Check command arguments
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Domains to check
    #[arg(required = true, value_name = "DOMAIN")]
    pub names: Vec<String>,

    /// Domain list file (default: from configuration)
    #[arg(long, value_name = "FILE")]
    pub domains: Option<PathBuf>,
}

/// Execute the check command
pub fn execute(args: CheckArgs, config: &Config) -> Result<()> {
    let trie = load_domains(&config.domains, args.domains)?;

    println!("Domain list: {} entries", trie.len().to_string().green());
    println!("{}", "─".repeat(50).bright_black());

    for name in &args.names {
        if trie.matches(name) {
            println!("  {} {} {}", "●".red(), name.cyan(), "matched".red());
        } else {
            println!("  {} {} {}", "○".green(), name, "not matched".dimmed());
        }
    }

    Ok(())
}
