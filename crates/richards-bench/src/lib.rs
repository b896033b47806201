//! Benchmark driver for the Richards scheduling kernel.
//!
//! - **[`config`]** -- `[benchmark]` TOML configuration with builder overrides.
//! - **[`driver`]** -- Repeated, self-checked simulation runs and the timing
//!   report.
//! - **[`ipc`]** -- Publish/subscribe bus for lifecycle events and samples.
//! - **[`sampler`]** -- Background CPU and memory sampling.
//! - **[`rusage`]** -- `getrusage` snapshots of the current process.
//! - **[`error`]** -- Bench error types via [`thiserror`].

pub mod config;
pub mod driver;
pub mod error;
pub mod ipc;
pub mod rusage;
pub mod sampler;

pub use config::BenchmarkConfig;
pub use driver::{BenchmarkDriver, BenchmarkReport, StopHandle};
pub use error::{BenchError, Result};
pub use ipc::{Event, IpcBus};
pub use sampler::{ResourceSample, ResourceSampler};
