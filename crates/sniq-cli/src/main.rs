//! sniqueue CLI
//!
//! Command-line interface for the NFQUEUE SNI firewall.

mod args;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use args::Args;
use commands::Command;

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = args.load_config()?;
    if let Command::Run(ref run_args) = args.command {
        run_args.apply(&mut config);
    }

    let _guard = logging::init(&args, &config.logging)?;

    let result = match args.command {
        Command::Run(_) => commands::run::execute(config),
        Command::Check(check_args) => commands::check::execute(check_args, &config),
        Command::Classify(classify_args) => commands::classify::execute(classify_args, &config),
        Command::Config(config_args) => commands::config::execute(config_args, &config),
        Command::Completions(comp_args) => commands::completions::execute(comp_args),
    };

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}
