//! CLI argument definitions for the `richards` binary.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Richards -- the classic operating-system scheduler benchmark.
#[derive(Parser)]
#[command(
    name = "richards",
    version,
    about = "Richards -- priority scheduler simulation benchmark",
    long_about = "Simulates a small operating system kernel: an idle task, a worker, two \
                  packet handlers and two devices exchange packets under a \
                  priority-preemptive scheduler. Every run is checked against known \
                  queue and hold counts."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the timed, self-checked benchmark.
    Run {
        /// Configuration file (defaults to config/default.toml when present).
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Override the number of iterations.
        #[arg(long, short)]
        iterations: Option<u32>,

        /// Disable resource sampling.
        #[arg(long)]
        no_sample: bool,

        /// Print samples and the final report as JSON lines.
        #[arg(long)]
        json: bool,
    },

    /// Run a single simulation and print its counters.
    Check {
        /// Configuration file (defaults to config/default.toml when present).
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Idle task countdown.  Counters are only verified when this matches
        /// the configured countdown.
        #[arg(long)]
        idle_count: Option<u32>,
    },

    /// Print the effective configuration.
    Config {
        /// Configuration file (defaults to config/default.toml when present).
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}
