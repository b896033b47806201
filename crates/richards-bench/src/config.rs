//! Benchmark configuration.
//!
//! [`BenchmarkConfig`] is read from the `[benchmark]` table of a TOML file.
//! Every field is optional; missing fields take the standard values from
//! [`Default`], which reproduce the reference run (3000 iterations of the
//! 1000-step workload).  A builder-style API lets callers override individual
//! fields after loading.
//!
//! ```toml
//! [benchmark]
//! iterations = 3000
//! idle_count = 1000
//! expected_queue_count = 2322
//! expected_hold_count = 928
//! sample_resources = true
//! sample_interval_ms = 200
//! ```

use std::path::Path;
use std::time::Duration;

use richards_kernel::workload::{EXPECTED_HOLD_COUNT, EXPECTED_QUEUE_COUNT, IDLE_COUNT};
use richards_kernel::{ExpectedCounts, WorkloadConfig};
use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// Iteration and self-check settings for one benchmark invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Number of simulation runs.
    ///
    /// Default: **3000**.
    pub iterations: u32,

    /// Lower bound applied to `iterations`.
    ///
    /// Default: **16**.
    pub min_iterations: u32,

    /// Countdown of the idle task.
    ///
    /// Default: **1000**.
    pub idle_count: u32,

    /// Packets a correct run must queue.
    ///
    /// Default: **2322**.
    pub expected_queue_count: u64,

    /// Holds a correct run must perform.
    ///
    /// Default: **928**.
    pub expected_hold_count: u64,

    /// Whether to sample process resource usage from the midpoint on.
    ///
    /// Default: **true**.
    pub sample_resources: bool,

    /// Delay between resource samples, in milliseconds.
    ///
    /// Default: **200**.
    pub sample_interval_ms: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            iterations: 3000,
            min_iterations: 16,
            idle_count: IDLE_COUNT,
            expected_queue_count: EXPECTED_QUEUE_COUNT,
            expected_hold_count: EXPECTED_HOLD_COUNT,
            sample_resources: true,
            sample_interval_ms: 200,
        }
    }
}

/// Top-level layout of the configuration file.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    benchmark: BenchmarkConfig,
}

impl BenchmarkConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `[benchmark]` table out of a TOML document.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|source| BenchError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        file.benchmark.validate()?;
        Ok(file.benchmark)
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| BenchError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content, path)?;
        tracing::debug!(path = %path.display(), ?config, "benchmark configuration loaded");
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Reject values that cannot produce a meaningful benchmark.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(BenchError::InvalidConfig {
                reason: "iterations must be at least 1".into(),
            });
        }
        if self.idle_count == 0 {
            return Err(BenchError::InvalidConfig {
                reason: "idle_count must be at least 1".into(),
            });
        }
        if self.sample_interval_ms == 0 {
            return Err(BenchError::InvalidConfig {
                reason: "sample_interval_ms must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Iterations that will actually run once `min_iterations` is applied.
    pub fn effective_iterations(&self) -> u32 {
        self.iterations.max(self.min_iterations)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// The kernel-level parameters of every iteration.
    pub fn workload(&self) -> WorkloadConfig {
        WorkloadConfig {
            idle_count: self.idle_count,
            expected: ExpectedCounts {
                queue_count: self.expected_queue_count,
                hold_count: self.expected_hold_count,
            },
        }
    }

    /// Set the number of iterations.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the iteration floor.
    pub fn with_min_iterations(mut self, min_iterations: u32) -> Self {
        self.min_iterations = min_iterations;
        self
    }

    /// Set the idle countdown together with the counters it must produce.
    pub fn with_workload(mut self, idle_count: u32, expected: ExpectedCounts) -> Self {
        self.idle_count = idle_count;
        self.expected_queue_count = expected.queue_count;
        self.expected_hold_count = expected.hold_count;
        self
    }

    /// Enable or disable resource sampling.
    pub fn with_sample_resources(mut self, enabled: bool) -> Self {
        self.sample_resources = enabled;
        self
    }

    /// Set the sampling interval (in milliseconds).
    pub fn with_sample_interval_ms(mut self, ms: u64) -> Self {
        self.sample_interval_ms = ms;
        self
    }
}
