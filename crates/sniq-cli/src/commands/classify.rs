//! Classify command - run one captured packet through the classifier
//!
//! Handy for checking a packet dumped with `tcpdump -x` or Wireshark's
//! "Copy as Hex Stream" against the configured list and policy.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use sniq_core::config::Config;
use sniq_core::packet::{Decoded, TcpFlags, TransportSegment};
use sniq_core::{Classification, Classifier, DomainSet, Outcome, Packet, Policy, Verdict};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use super::load_domains;

/// Classify command arguments
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Hex-encoded IP packet, whitespace ignored; "-" reads stdin
    #[arg(value_name = "HEX")]
    pub packet: String,

    /// Domain list file (default: from configuration)
    #[arg(long, value_name = "FILE")]
    pub domains: Option<PathBuf>,

    /// Drop matched packets
    #[arg(short, long)]
    pub drop: bool,

    /// Mark matched packets with this value
    #[arg(short, long, value_name = "MARK", conflicts_with = "drop")]
    pub mark: Option<u32>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Machine-readable classification result
#[derive(Debug, Serialize)]
struct Report {
    length: usize,
    network: Option<String>,
    src: Option<String>,
    dst: Option<String>,
    transport: Option<String>,
    protocol: Option<u8>,
    /// TCP segment with SYN, FIN or RST set
    control: bool,
    src_port: Option<u16>,
    dst_port: Option<u16>,
    sni: Option<String>,
    outcome: &'static str,
    error: Option<String>,
    verdict: String,
}

impl Report {
    fn new(packet: &Packet, decoded: Option<&Decoded>, classification: &Classification) -> Self {
        let error = match &classification.outcome {
            Outcome::DecodeFailed(e) => Some(e.to_string()),
            _ => None,
        };
        Self {
            length: packet.len(),
            network: decoded.map(|d| format!("IPv{}", d.network.version().to_u8())),
            src: decoded.map(|d| d.network.src().to_string()),
            dst: decoded.map(|d| d.network.dst().to_string()),
            transport: decoded.map(|d| transport_name(&d.transport).to_owned()),
            protocol: decoded.map(|d| d.network.protocol().to_u8()),
            control: decoded
                .and_then(|d| d.transport.tcp_flags())
                .is_some_and(TcpFlags::is_control),
            src_port: decoded.map(|d| d.transport.src_port()),
            dst_port: decoded.map(|d| d.transport.dst_port()),
            sni: classification.outcome.hostname().map(str::to_owned),
            outcome: outcome_name(&classification.outcome),
            error,
            verdict: classification.verdict.to_string(),
        }
    }
}

/// Execute the classify command
pub fn execute(args: ClassifyArgs, config: &Config) -> Result<()> {
    let hex = if args.packet == "-" {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read packet from stdin")?;
        input
    } else {
        args.packet.clone()
    };
    let packet = Packet::from_hex(0, 0, &hex).context("Invalid packet hex")?;

    let trie = load_domains(&config.domains, args.domains.clone())?;
    let classifier = Classifier::new(Arc::new(DomainSet::new(trie)), policy(&args, config));

    let decoded = packet.decode();
    let classification = classifier.classify_decoded(&packet, decoded.as_ref());
    let decoded = decoded.ok();
    let report = Report::new(&packet, decoded.as_ref(), &classification);

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize result")?;
        println!("{json}");
    } else {
        print_report(&report, decoded.as_ref(), classification.verdict);
    }
    Ok(())
}

fn policy(args: &ClassifyArgs, config: &Config) -> Policy {
    if args.drop {
        return Policy::drop_on_match();
    }
    match args.mark {
        Some(mark) => Policy::mark_on_match(mark),
        None => config.policy(),
    }
}

fn transport_name(transport: &TransportSegment) -> &'static str {
    match transport {
        TransportSegment::Tcp(_) => "TCP",
        TransportSegment::Udp(_) => "UDP",
    }
}

fn outcome_name(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::DecodeFailed(_) => "decode_failed",
        Outcome::NoHostname => "no_hostname",
        Outcome::Unmatched(_) => "unmatched",
        Outcome::Matched(_) => "matched",
    }
}

fn print_report(report: &Report, decoded: Option<&Decoded>, verdict: Verdict) {
    println!("Length:    {} bytes", report.length);

    if let Some(decoded) = decoded {
        println!(
            "Network:   {} {} -> {}",
            report.network.as_deref().unwrap_or("-"),
            decoded.network.src(),
            decoded.network.dst()
        );
        let flags = decoded
            .transport
            .tcp_flags()
            .map(|f| format!(" {f:?}"))
            .unwrap_or_default();
        println!(
            "Transport: {} ({}) {} -> {}{}",
            transport_name(&decoded.transport),
            report.protocol.unwrap_or_default(),
            decoded.transport.src_port(),
            decoded.transport.dst_port(),
            flags
        );
        if report.control {
            println!("Control:   no payload to inspect");
        }
        if let Some(violation) = decoded.hello.as_ref().and_then(|h| h.violation) {
            println!("Warning:   {}", violation.to_string().yellow());
        }
    }
    if let Some(ref error) = report.error {
        println!("Decode:    {} ({})", "failed".yellow(), error);
    }

    println!("SNI:       {}", report.sni.as_deref().unwrap_or("-").cyan());
    println!("Outcome:   {}", report.outcome.replace('_', " "));

    let verdict_str = verdict.to_string();
    let verdict_str = match verdict {
        Verdict::Drop => verdict_str.red().bold(),
        Verdict::AcceptWithMark(_) => verdict_str.yellow().bold(),
        Verdict::Accept => verdict_str.green().bold(),
    };
    println!("Verdict:   {verdict_str}");
}
