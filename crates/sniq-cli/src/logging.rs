//! Logging initialization

use anyhow::{Context, Result};
use sniq_core::config::{LogFormat, LoggingConfig};
use std::path::Path;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

use crate::args::Args;

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Initialize logging from CLI arguments and the `[logging]` section
///
/// The returned guard flushes the log file when dropped and must live until
/// exit.
pub fn init(args: &Args, config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = level(args, config)?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let format = args.log_format.map_or(config.format, Into::into);

    let (file_layer, guard) = match args.log_file.as_deref().or(config.file.as_deref()) {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            (Some(file_layer(format, writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer(format, args.verbose))
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(guard)
}

/// Effective level: `--quiet`, then `-v`, then per-packet logging, then the
/// configured level
fn level(args: &Args, config: &LoggingConfig) -> Result<Level> {
    if args.quiet {
        return Ok(Level::ERROR);
    }
    match args.verbose {
        0 => {}
        1 => return Ok(Level::DEBUG),
        _ => return Ok(Level::TRACE),
    }

    let configured: Level = config
        .level
        .parse()
        .with_context(|| format!("Invalid log level: {}", config.level))?;
    if config.packets && configured < Level::DEBUG {
        return Ok(Level::DEBUG);
    }
    Ok(configured)
}

fn stderr_layer<S>(format: LogFormat, verbose: u8) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer().with_writer(std::io::stderr);
    match format {
        LogFormat::Text => layer
            .with_target(verbose >= 2)
            .with_thread_names(verbose >= 2)
            .with_file(verbose >= 2)
            .with_line_number(verbose >= 2)
            .boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn file_layer<S, W>(format: LogFormat, writer: W) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_ansi(false).with_writer(writer);
    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn file_writer(path: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}
