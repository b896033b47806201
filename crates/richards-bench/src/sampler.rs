//! Periodic resource sampling.
//!
//! The [`ResourceSampler`] runs as a background tokio task next to the
//! benchmark loop.  Every interval it takes a [`rusage_self`] snapshot,
//! converts the CPU-time delta into a utilisation percentage and publishes
//! the result on the [`IpcBus`].  The benchmark loop never waits on it.
//!
//! The baseline is captured when the sampler is created, so the first sample
//! (published by [`ResourceSampler::start`] itself) covers everything since
//! then.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::ipc::{Event, IpcBus};
use crate::rusage::{ProcUsage, rusage_self};

// ---------------------------------------------------------------------------
// Sample
// ---------------------------------------------------------------------------

/// One resource usage observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    pub timestamp: DateTime<Utc>,
    /// Peak resident set size of the process so far.
    pub max_rss_bytes: u64,
    /// CPU time over wall time since the previous sample, as a percentage.
    /// May exceed 100 on multi-threaded runtimes.
    pub cpu_percent: f64,
}

/// Tracks the previous snapshot so each sample reports a delta.
#[derive(Debug, Clone, Copy)]
struct Baseline {
    usage: ProcUsage,
    at: Instant,
}

impl Baseline {
    fn now() -> Self {
        Self {
            usage: rusage_self(),
            at: Instant::now(),
        }
    }

    /// Take a new snapshot, turn it into a sample and advance the baseline.
    fn advance(&mut self) -> ResourceSample {
        let next = Self::now();
        let wall = next.at.duration_since(self.at);
        let cpu = next.usage.cpu_time_since(&self.usage);
        let sample = ResourceSample {
            timestamp: Utc::now(),
            max_rss_bytes: next.usage.max_rss_bytes,
            cpu_percent: cpu_percent(cpu, wall),
        };
        *self = next;
        sample
    }
}

fn cpu_percent(cpu: Duration, wall: Duration) -> f64 {
    if wall.is_zero() {
        return 0.0;
    }
    cpu.as_secs_f64() / wall.as_secs_f64() * 100.0
}

// ---------------------------------------------------------------------------
// Sampler
// ---------------------------------------------------------------------------

/// Background publisher of [`ResourceSample`]s.
///
/// Cheaply cloneable; all clones control the same background task.
#[derive(Clone)]
pub struct ResourceSampler {
    inner: Arc<SamplerInner>,
}

struct SamplerInner {
    bus: IpcBus,
    origin: Baseline,
    interval: Duration,
    /// Wakes the loop early on shutdown.
    notify: Notify,
    shutdown: AtomicBool,
}

impl ResourceSampler {
    /// Create a sampler **without** starting it.  Resource usage is measured
    /// from this point on.
    #[must_use]
    pub fn new(bus: IpcBus, interval: Duration) -> Self {
        Self {
            inner: Arc::new(SamplerInner {
                bus,
                origin: Baseline::now(),
                interval,
                notify: Notify::new(),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// Publish one sample right away, then spawn the periodic loop onto the
    /// tokio runtime.
    pub fn start(&self) -> JoinHandle<()> {
        let mut baseline = self.inner.origin;
        let first = baseline.advance();
        Self::publish(&self.inner, first);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tracing::debug!(interval_ms = inner.interval.as_millis() as u64, "resource sampler started");
            let published = Self::sample_loop(&inner, baseline).await;
            tracing::debug!(samples = published + 1, "resource sampler stopped");
        })
    }

    /// Ask the loop to exit.  Takes effect immediately, even mid-sleep.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.notify.notify_one();
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    fn publish(inner: &SamplerInner, sample: ResourceSample) {
        tracing::trace!(
            max_rss_bytes = sample.max_rss_bytes,
            cpu_percent = sample.cpu_percent,
            "resource sample"
        );
        inner.bus.publish(Event::ResourceSample(sample));
    }

    async fn sample_loop(inner: &SamplerInner, mut baseline: Baseline) -> u64 {
        let mut published = 0u64;

        loop {
            if inner.shutdown.load(Ordering::Acquire) {
                break;
            }

            tokio::select! {
                () = tokio::time::sleep(inner.interval) => {}
                () = inner.notify.notified() => continue,
            }

            if inner.shutdown.load(Ordering::Acquire) {
                break;
            }

            Self::publish(inner, baseline.advance());
            published += 1;
        }

        published
    }
}

impl std::fmt::Debug for ResourceSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceSampler")
            .field("interval", &self.inner.interval)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
