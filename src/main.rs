//! fwd-scrub - Forward scrub thrasher for CephFS
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use fwd_scrub::ceph::{CephCli, CephCliConfig};
use fwd_scrub::config::{CliArgs, ScrubConfig};
use fwd_scrub::report::{print_header, print_summary};
use fwd_scrub::{ScrubRegistry, ThrasherRegistry};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let config = ScrubConfig::from_args(&args).context("Invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    runtime.block_on(run_async(args, config))
}

async fn run_async(args: CliArgs, config: ScrubConfig) -> Result<()> {
    let duration = args.duration.map(Duration::from_secs);
    print_header(&config, duration);

    // Ctrl+C ends the run; a second press exits immediately
    let interrupt = Arc::new(Notify::new());
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupt = interrupt.clone();
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || {
            if interrupted.swap(true, Ordering::SeqCst) {
                eprintln!("\nForce shutdown!");
                std::process::exit(130);
            }
            eprintln!("\nInterrupt received, stopping scrubbers... (press Ctrl+C again to force)");
            interrupt.notify_one();
        })
        .context("Failed to set signal handler")?;
    }

    let cli = CephCli::new(CephCliConfig::new(
        args.ceph_bin.clone(),
        &config,
        Duration::from_secs(args.command_timeout),
    ));
    let thrashers = Arc::new(ThrasherRegistry::new());

    let registry = tokio::select! {
        registry = ScrubRegistry::start(Arc::new(cli), config, thrashers) => {
            registry.context("Failed to start scrub thrashing")?
        }
        _ = interrupt.notified() => {
            info!("Interrupted before scrubbing started");
            return Ok(());
        }
    };

    let start = Instant::now();
    match duration {
        Some(limit) => {
            tokio::select! {
                _ = tokio::time::sleep(limit) => info!("Run time elapsed"),
                _ = interrupt.notified() => {}
            }
        }
        None => interrupt.notified().await,
    }

    let result = registry.teardown().await;
    print_summary(&registry.stats(), start.elapsed(), result.is_err());

    result.context("Scrub thrashing failed")
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("fwd_scrub=debug,warn")
    } else {
        EnvFilter::new("fwd_scrub=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
