//! Side-channel event bus.
//!
//! The driver reports lifecycle milestones and resource samples through a
//! lightweight publish/subscribe bus built on top of
//! [`tokio::sync::broadcast`].  Consumers (the CLI, a parent process relay,
//! tests) subscribe independently; the scheduling core never waits on them.
//!
//! Events are wrapped in [`Arc`] so that broadcasting to multiple subscribers
//! does not require cloning the payload.
//!
//! # Usage
//!
//! ```rust,no_run
//! # use richards_bench::ipc::{IpcBus, Event};
//! # async fn example() {
//! let bus = IpcBus::new(64);
//! let mut rx = bus.subscribe();
//!
//! let event = rx.recv().await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::sampler::ResourceSample;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// An event that flows through the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// The driver is about to run its first iteration.
    BenchmarkStarted {
        run_id: Uuid,
        /// Iterations the driver intends to run.
        iterations: u32,
        timestamp: DateTime<Utc>,
    },

    /// Periodic process resource usage.
    ResourceSample(ResourceSample),

    /// The driver finished (or was stopped) and produced its report.
    BenchmarkCompleted {
        run_id: Uuid,
        runs: u32,
        /// Mean time per iteration in microseconds.
        mean_us: f64,
        stopped_early: bool,
        timestamp: DateTime<Utc>,
    },
}

// ---------------------------------------------------------------------------
// IPC Bus
// ---------------------------------------------------------------------------

/// Publish/subscribe event bus backed by [`tokio::sync::broadcast`].
///
/// The bus is cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone, Debug)]
pub struct IpcBus {
    inner: Arc<IpcBusInner>,
}

#[derive(Debug)]
struct IpcBusInner {
    sender: broadcast::Sender<Arc<Event>>,
}

impl IpcBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// A subscriber that falls behind by more than `capacity` events receives
    /// [`broadcast::error::RecvError::Lagged`].
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(IpcBusInner { sender }),
        }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of receivers that will observe it.  With nobody
    /// listening the event is dropped; that is not an error.
    pub fn publish(&self, event: Event) -> usize {
        match self.inner.sender.send(Arc::new(event)) {
            Ok(n) => {
                tracing::trace!(receivers = n, "event published");
                n
            }
            Err(_) => {
                tracing::trace!("event published but no active receivers");
                0
            }
        }
    }

    /// Create a new subscriber that will receive all future events.
    ///
    /// Events published *before* this call are **not** replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Event>> {
        tracing::trace!("new bus subscriber created");
        self.inner.sender.subscribe()
    }

    /// Return the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }
}

impl Default for IpcBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
