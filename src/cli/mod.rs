// CLI module - check configs, pipe stdin through the engine, measure throughput

mod output;

use crate::config::{Config, ConfigFile, ConfigSource, DEFAULT_POLL_INTERVAL};
use crate::event::Level;
use crate::manager::Manager;
use crate::registry;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// relaylog - buffered, rotating log distribution
#[derive(Parser)]
#[command(name = "relaylog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and list its targets
    Check {
        /// Path to the config file (.toml or .json)
        config: PathBuf,
    },

    /// Log every line read from stdin
    Pipe {
        /// Path to the config file (.toml or .json)
        config: PathBuf,

        /// Logger name attached to each line
        #[arg(short, long, default_value = "stdin")]
        name: String,

        /// Level each line is logged at
        #[arg(short, long, default_value = "info")]
        level: Level,

        /// Seconds between config change checks
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
        poll: u64,
    },

    /// Write synthetic events from several threads and report throughput
    Bench {
        /// Path to the config file (.toml or .json)
        config: PathBuf,

        /// Number of producer threads
        #[arg(short, long, default_value = "4")]
        threads: usize,

        /// Events written by each thread
        #[arg(short, long, default_value = "100000")]
        events: usize,
    },
}

impl Cli {
    /// Run the CLI application
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute()
    }

    /// Execute the parsed command
    fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Check { config } => check(config),
            Commands::Pipe {
                config,
                name,
                level,
                poll,
            } => {
                let runtime = tokio::runtime::Runtime::new()
                    .context("Failed to start the async runtime")?;
                runtime.block_on(pipe(config, name, *level, Duration::from_secs(*poll)))
            }
            Commands::Bench {
                config,
                threads,
                events,
            } => bench(config, *threads, *events),
        }
    }
}

/// Instantiate every target on its own so one bad entry does not hide the others
fn check(path: &Path) -> Result<()> {
    let file = ConfigFile::read(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;

    let checks: Vec<_> = file
        .resolved_targets()
        .into_iter()
        .map(|descriptor| {
            let status = registry::create_target(&descriptor.kind, &descriptor).map(|_| ());
            (descriptor, status)
        })
        .collect();

    output::print_target_table(&checks);

    let failed = checks.iter().filter(|(_, status)| status.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} target(s) are invalid", failed, checks.len());
    }
    output::print_success(&format!("{} is valid", path.display()));
    Ok(())
}

async fn pipe(path: &Path, name: &str, level: Level, poll: Duration) -> Result<()> {
    let mut source = ConfigSource::with_poll_interval(poll);
    let config = source
        .load(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;

    let manager = Arc::new(Manager::new(config).context("Failed to start the log manager")?);

    let reload_manager = Arc::clone(&manager);
    source.start_monitor(move |config: Config| {
        if let Err(e) = reload_manager.reload(config) {
            warn!(error = %e, "Reload rejected");
        }
    });

    let logger = manager.get_logger(name);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut forwarded: u64 = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        logger.log(level, None, vec![Value::String(line)]);
                        forwarded += 1;
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                output::print_info("Interrupted, flushing");
                break;
            }
        }
    }

    source.stop_monitor().await;

    // Stopping joins the flush thread and writes to disk, keep it off the async workers
    let stopping = Arc::clone(&manager);
    tokio::task::spawn_blocking(move || stopping.stop())
        .await
        .context("Log manager shutdown failed")?;

    output::print_success(&format!("Forwarded {} line(s)", forwarded));
    Ok(())
}

fn bench(path: &Path, threads: usize, events: usize) -> Result<()> {
    let config = Config::from_file(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    let manager = Manager::new(config).context("Failed to start the log manager")?;

    let started = Instant::now();
    thread::scope(|scope| {
        for worker in 0..threads {
            let logger = manager.get_logger(&format!("bench-{}", worker));
            scope.spawn(move || {
                for i in 0..events {
                    logger.infof("event {} from worker {}", [Value::from(i), Value::from(worker)]);
                }
            });
        }
    });
    let produced = started.elapsed();

    manager.stop();
    let total = started.elapsed();

    output::print_bench_summary(threads * events, threads, produced, total);
    Ok(())
}
