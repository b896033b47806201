//! The benchmark driver.
//!
//! [`BenchmarkDriver`] repeats the full build-and-schedule simulation,
//! verifies the counters after every iteration and times the whole series.
//! It runs on the tokio runtime and yields between iterations; one
//! simulation is always run to completion before the next begins.
//!
//! Side-channel output (lifecycle events and resource samples) goes to an
//! optional [`IpcBus`].  A [`StopHandle`] lets another task end the series
//! early.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use richards_kernel::{SimulationOutcome, WorkloadConfig, run_richards};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::BenchmarkConfig;
use crate::error::Result;
use crate::ipc::{Event, IpcBus};
use crate::sampler::ResourceSampler;

// ---------------------------------------------------------------------------
// Stop handle
// ---------------------------------------------------------------------------

/// Requests that a running benchmark stop before its next iteration.
///
/// Cheaply cloneable; every clone controls the same driver.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        tracing::info!("benchmark stop requested");
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Result of one benchmark invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Iterations that ran to completion.
    pub runs: u32,
    /// Time spent inside simulations, in milliseconds.
    pub elapsed_ms: f64,
    /// Wall time of the whole invocation, in milliseconds.
    pub total_ms: f64,
    /// Mean time per iteration, in microseconds.
    pub mean_us: f64,
    /// Root-mean-square deviation of the per-iteration time, in microseconds.
    pub rms_us: f64,
    /// Counters of the last completed iteration.
    pub outcome: Option<SimulationOutcome>,
    pub stopped_early: bool,
}

impl BenchmarkReport {
    fn new(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        series: &Series,
        total: Duration,
    ) -> Self {
        let samples: Vec<f64> = series.latencies.iter().map(as_micros).collect();
        let elapsed: Duration = series.latencies.iter().sum();
        let runs = series.latencies.len() as u32;
        let mean_us = if runs == 0 {
            0.0
        } else {
            as_micros(&elapsed) / f64::from(runs)
        };

        Self {
            run_id,
            started_at,
            runs,
            elapsed_ms: elapsed.as_secs_f64() * 1_000.0,
            total_ms: total.as_secs_f64() * 1_000.0,
            mean_us,
            rms_us: rms_deviation(&samples),
            outcome: series.last,
            stopped_early: series.stopped_early,
        }
    }

    /// Render as a single-line JSON object.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Runs: {}", self.runs)?;
        writeln!(f, "Elapsed: {:.3} ms", self.elapsed_ms)?;
        writeln!(f, "Total time: {:.3} ms", self.total_ms)?;
        write!(f, "Richards: {:.3} us/iteration (rms {:.3})", self.mean_us, self.rms_us)?;
        if self.stopped_early {
            write!(f, " [stopped early]")?;
        }
        Ok(())
    }
}

fn as_micros(d: &Duration) -> f64 {
    d.as_secs_f64() * 1_000_000.0
}

/// Root-mean-square deviation from the mean.  Zero for fewer than two values.
fn rms_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (squares / n).sqrt()
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// What the iteration loop produced, successful or not.
#[derive(Debug, Default)]
struct Series {
    latencies: Vec<Duration>,
    last: Option<SimulationOutcome>,
    stopped_early: bool,
}

/// Runs the Richards simulation repeatedly and reports timing.
#[derive(Debug)]
pub struct BenchmarkDriver {
    config: BenchmarkConfig,
    bus: Option<IpcBus>,
    stop: StopHandle,
}

impl BenchmarkDriver {
    #[must_use]
    pub fn new(config: BenchmarkConfig) -> Self {
        Self {
            config,
            bus: None,
            stop: StopHandle::default(),
        }
    }

    /// Publish lifecycle events and resource samples on `bus`.
    #[must_use]
    pub fn with_bus(mut self, bus: IpcBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// A handle that stops this driver before its next iteration.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run the configured number of iterations.
    ///
    /// Fails on an invalid configuration or on the first iteration whose
    /// counters differ from the expected ones.
    pub async fn run(&self) -> Result<BenchmarkReport> {
        self.config.validate()?;
        let workload = self.config.workload();
        workload.validate()?;

        let iterations = self.config.effective_iterations();
        if iterations != self.config.iterations {
            tracing::warn!(
                requested = self.config.iterations,
                min_iterations = self.config.min_iterations,
                "iteration count raised to the configured minimum"
            );
        }

        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        tracing::info!(
            %run_id,
            iterations,
            idle_count = workload.idle_count,
            "benchmark started"
        );
        self.publish(Event::BenchmarkStarted {
            run_id,
            iterations,
            timestamp: started_at,
        });

        let sampler = match (&self.bus, self.config.sample_resources) {
            (Some(bus), true) => Some(ResourceSampler::new(
                bus.clone(),
                self.config.sample_interval(),
            )),
            _ => None,
        };
        let mut sampler_task = None;

        let wall = Instant::now();
        let mut series = Series {
            latencies: Vec::with_capacity(iterations as usize),
            ..Series::default()
        };
        let result = self
            .run_series(
                &workload,
                iterations,
                sampler.as_ref(),
                &mut sampler_task,
                &mut series,
            )
            .await;
        let total = wall.elapsed();

        if let Some(sampler) = &sampler {
            sampler.shutdown();
        }
        if let Some(handle) = sampler_task {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "resource sampler task failed");
            }
        }

        if let Err(e) = result {
            tracing::error!(%run_id, runs = series.latencies.len(), error = %e, "benchmark failed");
            return Err(e);
        }

        let report = BenchmarkReport::new(run_id, started_at, &series, total);
        tracing::info!(
            %run_id,
            runs = report.runs,
            elapsed_ms = report.elapsed_ms,
            total_ms = report.total_ms,
            mean_us = report.mean_us,
            stopped_early = report.stopped_early,
            "benchmark finished"
        );
        self.publish(Event::BenchmarkCompleted {
            run_id,
            runs: report.runs,
            mean_us: report.mean_us,
            stopped_early: report.stopped_early,
            timestamp: Utc::now(),
        });
        Ok(report)
    }

    // -- Private helpers ----------------------------------------------------

    async fn run_series(
        &self,
        workload: &WorkloadConfig,
        iterations: u32,
        sampler: Option<&ResourceSampler>,
        sampler_task: &mut Option<JoinHandle<()>>,
        series: &mut Series,
    ) -> Result<()> {
        let sample_after = iterations / 2 + 1;

        for iteration in 1..=iterations {
            if self.stop.is_stopped() {
                tracing::info!(completed = iteration - 1, "benchmark stopped before iteration");
                series.stopped_early = true;
                break;
            }

            let begin = Instant::now();
            let outcome = run_richards(workload)?;
            let elapsed = begin.elapsed();

            series.latencies.push(elapsed);
            series.last = Some(outcome);
            tracing::debug!(
                iteration,
                elapsed_us = as_micros(&elapsed),
                queue_count = outcome.queue_count,
                hold_count = outcome.hold_count,
                "iteration complete"
            );

            if iteration == sample_after && iteration < iterations {
                if let Some(sampler) = sampler {
                    tracing::debug!(iteration, "starting resource sampler");
                    *sampler_task = Some(sampler.start());
                }
            }

            tokio::task::yield_now().await;
        }
        Ok(())
    }

    fn publish(&self, event: Event) {
        if let Some(bus) = &self.bus {
            bus.publish(event);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
