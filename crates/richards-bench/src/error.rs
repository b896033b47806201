//! Benchmark error types.

use std::path::PathBuf;

use richards_kernel::KernelError;

/// Unified error type for the benchmark driver.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    // -- Configuration errors -----------------------------------------------
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`BenchmarkConfig`](crate::BenchmarkConfig).
    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A configuration value is out of range.
    #[error("invalid benchmark configuration: {reason}")]
    InvalidConfig { reason: String },

    // -- Upstream crate errors -----------------------------------------------
    /// An error propagated from the kernel, including a failed self-check.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    // -- Serialization -------------------------------------------------------
    /// JSON serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the bench crate.
pub type Result<T> = std::result::Result<T, BenchError>;
