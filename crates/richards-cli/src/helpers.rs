//! Shared helper functions used across CLI subcommands.
//!
//! Includes tracing initialization and configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use richards_bench::BenchmarkConfig;
use tracing_subscriber::EnvFilter;

/// Configuration file picked up when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
///
/// Logs go to stderr so that stdout carries only results.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Load the configuration named on the command line, or the default file
/// if it exists, or built-in defaults.
///
/// An explicitly named file must exist.
pub fn load_config(path: Option<&Path>) -> Result<BenchmarkConfig> {
    match path {
        Some(path) => BenchmarkConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => BenchmarkConfig::load_or_default(PathBuf::from(DEFAULT_CONFIG_PATH))
            .context("failed to load default configuration"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.toml");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn explicit_file_is_used() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[benchmark]\niterations = 7").expect("write");
        let cfg = load_config(Some(file.path())).expect("load");
        assert_eq!(cfg.iterations, 7);
    }
}
