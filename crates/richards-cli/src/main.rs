//! CLI entry point for the Richards benchmark.
//!
//! This binary provides the `richards` command with subcommands for running
//! the timed benchmark, checking a single simulation and printing the
//! effective configuration.

mod cli;
mod helpers;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use richards_bench::{BenchmarkConfig, BenchmarkDriver, Event, IpcBus};
use richards_kernel::{run_simulation, workload};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use cli::{Cli, Commands};
use helpers::{init_tracing, load_config};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            iterations,
            no_sample,
            json,
        } => cmd_run(config.as_deref(), iterations, no_sample, json).await,
        Commands::Check { config, idle_count } => cmd_check(config.as_deref(), idle_count),
        Commands::Config { config } => cmd_config(config.as_deref()),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: run
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    iterations: Option<u32>,
    no_sample: bool,
    json: bool,
) -> Result<()> {
    init_tracing("info");

    let mut config = load_config(config_path)?;
    if let Some(iterations) = iterations {
        config = config.with_iterations(iterations);
    }
    if no_sample {
        config = config.with_sample_resources(false);
    }
    config.validate().context("invalid benchmark configuration")?;

    let bus = IpcBus::default();
    let listener = tokio::spawn(print_events(bus.subscribe(), json));

    let driver = BenchmarkDriver::new(config).with_bus(bus);
    let stop = driver.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing current iteration");
            stop.stop();
        }
    });

    let result = driver.run().await;

    // Dropping the last sender closes the bus and ends the listener.
    drop(driver);
    if let Err(e) = listener.await {
        warn!(error = %e, "event listener failed");
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "benchmark failed");
            return Err(e).context("benchmark failed");
        }
    };

    if json {
        println!("{}", report.to_json().context("failed to serialize report")?);
    } else {
        println!("{report}");
    }
    Ok(())
}

/// Log resource samples until the bus closes; with `json` also print each
/// one to stdout.
async fn print_events(mut rx: broadcast::Receiver<Arc<Event>>, json: bool) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Event::ResourceSample(sample) = event.as_ref() {
                    info!(
                        max_rss_bytes = sample.max_rss_bytes,
                        cpu_percent = sample.cpu_percent,
                        "resource usage"
                    );
                    if json {
                        match serde_json::to_string(event.as_ref()) {
                            Ok(line) => println!("{line}"),
                            Err(e) => warn!(error = %e, "failed to serialize sample"),
                        }
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommand: check
// ---------------------------------------------------------------------------

fn cmd_check(config_path: Option<&Path>, idle_count: Option<u32>) -> Result<()> {
    init_tracing("warn");

    let config = load_config(config_path)?;
    let mut workload = config.workload();
    let verify = match idle_count {
        Some(count) if count != workload.idle_count => {
            workload.idle_count = count;
            false
        }
        _ => true,
    };

    let outcome = run_simulation(&workload).context("failed to build the task graph")?;
    println!("idle_count  = {}", workload.idle_count);
    println!("queue_count = {}", outcome.queue_count);
    println!("hold_count  = {}", outcome.hold_count);

    if verify {
        outcome
            .verify(&workload.expected)
            .context("self-check failed")?;
        println!("self-check passed");
    } else {
        println!("no reference counters for this countdown, not verified");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: config
// ---------------------------------------------------------------------------

fn cmd_config(config_path: Option<&Path>) -> Result<()> {
    init_tracing("warn");

    let config = load_config(config_path)?;
    print_config(&config);
    Ok(())
}

fn print_config(config: &BenchmarkConfig) {
    println!("[benchmark]");
    println!("iterations           = {}", config.iterations);
    println!("min_iterations       = {}", config.min_iterations);
    println!("# effective iterations: {}", config.effective_iterations());
    println!("idle_count           = {}", config.idle_count);
    println!("expected_queue_count = {}", config.expected_queue_count);
    println!("expected_hold_count  = {}", config.expected_hold_count);
    println!("sample_resources     = {}", config.sample_resources);
    println!("sample_interval_ms   = {}", config.sample_interval_ms);
    println!();
    println!("tasks:");
    for (name, id, priority) in [
        ("idle", workload::IDLE, workload::IDLE_PRIORITY),
        ("worker", workload::WORKER, workload::WORKER_PRIORITY),
        ("handler_a", workload::HANDLER_A, workload::HANDLER_A_PRIORITY),
        ("handler_b", workload::HANDLER_B, workload::HANDLER_B_PRIORITY),
        ("device_a", workload::DEVICE_A, workload::DEVICE_A_PRIORITY),
        ("device_b", workload::DEVICE_B, workload::DEVICE_B_PRIORITY),
    ] {
        println!("  {id}  {name:<10} priority {priority}");
    }
}
