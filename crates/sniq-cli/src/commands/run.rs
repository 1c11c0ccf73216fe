//! Run command - filter packets from netfilter queues

use anyhow::{Context, Result};
use clap::Args;
use sniq_core::config::{Config, DomainsConfig};
use sniq_core::{Classifier, DomainList, DomainSet};
use sniq_platform::{PacketQueue, QueuedPacket};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, trace, warn};

/// How often idle loops look at the shutdown flag
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Consecutive receive failures before a worker gives up
const MAX_RECV_ERRORS: u32 = 16;

/// Run command arguments
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// First queue number to bind
    #[arg(short = 'Q', long, value_name = "NUM")]
    pub queue: Option<u16>,

    /// Number of consecutive queues, one worker thread each
    #[arg(short, long, value_name = "N")]
    pub threads: Option<usize>,

    /// Mark matched packets with this value
    #[arg(short, long, value_name = "MARK", conflicts_with = "drop")]
    pub mark: Option<u32>,

    /// Mark unmatched packets with this value
    #[arg(long, value_name = "MARK", conflicts_with = "drop")]
    pub good_mark: Option<u32>,

    /// Drop matched packets instead of marking them
    #[arg(short, long)]
    pub drop: bool,

    /// Log every packet verdict
    #[arg(long)]
    pub debug: bool,

    /// Domain list file
    #[arg(long, value_name = "FILE")]
    pub domains: Option<PathBuf>,
}

impl RunArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(queue) = self.queue {
            config.queue.number = queue;
        }
        if let Some(threads) = self.threads {
            config.queue.threads = threads;
        }
        if let Some(mark) = self.mark {
            config.policy.mark = mark;
            config.policy.drop = false;
        }
        if let Some(good_mark) = self.good_mark {
            config.policy.good_mark = Some(good_mark);
        }
        if self.drop {
            config.policy.drop = true;
        }
        if self.debug {
            config.logging.packets = true;
        }
        if let Some(ref file) = self.domains {
            config.domains.file = Some(file.clone());
        }
    }
}

/// Execute the run command
///
/// Overrides from [`RunArgs`] are already applied to `config`.
pub fn execute(config: Config) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let policy = config.policy();
    info!(
        "Starting on queue {} with verdict {}",
        config.queue.number, policy
    );

    let list = config.domains.list();
    let trie = config
        .domains
        .load_trie(list.as_ref())
        .context("Failed to load domain list")?;
    if trie.is_empty() {
        warn!("Domain list is empty, every packet will be accepted");
    }
    info!("Matching against {} domains", trie.len());

    let classifier = Classifier::new(Arc::new(DomainSet::new(trie)), policy)
        .with_packet_logging(config.logging.packets);

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down...");
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let started = Instant::now();
    let result = serve(&config, &classifier, list.as_ref(), &shutdown);

    let stats = classifier.stats().snapshot();
    info!(
        packets = stats.packets,
        matched = stats.matched,
        unmatched = stats.unmatched,
        no_hostname = stats.no_hostname,
        decode_failed = stats.decode_failed,
        dropped = stats.dropped,
        marked = stats.marked,
        accepted = stats.accepted,
        "sniqueue stopped after {:.1}s",
        started.elapsed().as_secs_f64()
    );

    result
}

#[cfg(target_os = "linux")]
fn serve(
    config: &Config,
    classifier: &Classifier,
    list: Option<&DomainList>,
    shutdown: &AtomicBool,
) -> Result<()> {
    use anyhow::anyhow;
    use sniq_platform::QueueOptions;
    use tracing::error;

    thread::scope(|scope| {
        let spawned = (|| -> std::io::Result<Vec<_>> {
            if let (Some(list), Some(interval)) = (list, config.domains.reload_interval()) {
                thread::Builder::new()
                    .name("reload".into())
                    .spawn_scoped(scope, move || {
                        reload_loop(list, &config.domains, classifier.domains(), interval, shutdown);
                    })?;
            }

            QueueOptions::from_config(&config.queue)
                .map(|options| {
                    thread::Builder::new()
                        .name(format!("queue-{}", options.number))
                        .spawn_scoped(scope, move || {
                            let result = open_queue(&options)
                                .and_then(|mut queue| worker(&mut queue, classifier, shutdown));
                            if result.is_err() {
                                shutdown.store(true, Ordering::SeqCst);
                            }
                            result
                        })
                })
                .collect()
        })();

        let workers = match spawned {
            Ok(workers) => workers,
            Err(e) => {
                shutdown.store(true, Ordering::SeqCst);
                return Err(e).context("Failed to spawn worker thread");
            }
        };

        let mut first_error = None;
        for handle in workers {
            let result = handle
                .join()
                .unwrap_or_else(|_| Err(anyhow!("Worker thread panicked")));
            if let Err(e) = result {
                error!("Worker failed: {:#}", e);
                first_error.get_or_insert(e);
            }
        }
        // Stop the reload thread as well
        shutdown.store(true, Ordering::SeqCst);

        first_error.map_or(Ok(()), Err)
    })
}

#[cfg(target_os = "linux")]
fn open_queue(options: &sniq_platform::QueueOptions) -> Result<sniq_platform::NfQueue> {
    sniq_platform::NfQueue::open(options).map_err(|e| {
        let hint = if e.is_permission_denied() {
            " (run as root or grant CAP_NET_ADMIN)"
        } else {
            ""
        };
        anyhow::Error::new(e).context(format!("Failed to open queue {}{}", options.number, hint))
    })
}

#[cfg(not(target_os = "linux"))]
fn serve(
    _config: &Config,
    _classifier: &Classifier,
    _list: Option<&DomainList>,
    _shutdown: &AtomicBool,
) -> Result<()> {
    anyhow::bail!(sniq_platform::PlatformError::Unsupported(
        "netfilter queues need Linux".into()
    ))
}

/// Pull packets from `queue` and answer each one until shutdown
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub fn worker<Q: PacketQueue>(
    queue: &mut Q,
    classifier: &Classifier,
    shutdown: &AtomicBool,
) -> Result<()> {
    let number = queue.queue_num();
    info!(queue = number, "Worker started");

    let mut recv_errors = 0u32;
    while !shutdown.load(Ordering::Relaxed) {
        let QueuedPacket { packet, ticket } = match queue.recv() {
            Ok(Some(queued)) => {
                recv_errors = 0;
                queued
            }
            Ok(None) => continue,
            Err(e) => {
                recv_errors += 1;
                if recv_errors >= MAX_RECV_ERRORS {
                    return Err(e).context(format!("Queue {number} keeps failing"));
                }
                warn!(queue = number, "Receive failed: {}", e);
                continue;
            }
        };

        trace!(queue = number, id = packet.id, len = packet.len(), "Received packet");
        let classification = classifier.classify(&packet);

        if let Err(e) = queue.verdict(ticket, classification.verdict) {
            warn!(queue = number, id = packet.id, "Failed to set verdict: {}", e);
        }
    }

    info!(queue = number, "Worker stopped");
    Ok(())
}

/// Check the list file every `interval` and publish changes until shutdown
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn reload_loop(
    list: &DomainList,
    domains: &DomainsConfig,
    set: &DomainSet,
    interval: Duration,
    shutdown: &AtomicBool,
) {
    info!(
        "Watching {} for changes every {}s",
        list.path().display(),
        interval.as_secs()
    );
    let mut last_check = Instant::now();
    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(SHUTDOWN_POLL.min(interval));
        if last_check.elapsed() < interval {
            continue;
        }
        last_check = Instant::now();
        reload(list, domains, set);
    }
}

/// Publish a fresh trie if the list file changed
///
/// A list that fails to load leaves the current trie in place.
pub fn reload(list: &DomainList, domains: &DomainsConfig, set: &DomainSet) -> bool {
    match list.check_reload() {
        Ok(Some(trie)) => {
            let trie = domains.complete(trie);
            let count = trie.len();
            set.replace(trie);
            info!("Domain list reloaded: {} domains", count);
            true
        }
        Ok(None) => false,
        Err(e) => {
            warn!("Domain list reload failed, keeping current list: {}", e);
            false
        }
    }
}
