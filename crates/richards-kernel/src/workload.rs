//! The standard Richards workload and its self-check.
//!
//! Six tasks exchange packets until the idle task's countdown expires:
//!
//! ```text
//! id  task       priority  initial queue
//! 0   idle       0         -            (starts running)
//! 1   worker     1000      2 x WORK
//! 2   handler A  2000      3 x DEVICE -> device A
//! 3   handler B  3000      3 x DEVICE -> device B
//! 4   device A   4000      -
//! 5   device B   5000      -
//! ```
//!
//! With a countdown of 1000 a correct scheduler queues exactly 2322 packets
//! and performs exactly 928 holds.

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::packet::{Packet, PacketKind, PacketLink};
use crate::scheduler::{Scheduler, TaskId};
use crate::task::Priority;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const IDLE: TaskId = 0;
pub const WORKER: TaskId = 1;
pub const HANDLER_A: TaskId = 2;
pub const HANDLER_B: TaskId = 3;
pub const DEVICE_A: TaskId = 4;
pub const DEVICE_B: TaskId = 5;

/// Size of the scheduler's id table for this workload.
pub const NUMBER_OF_IDS: usize = 6;

pub const IDLE_PRIORITY: Priority = 0;
pub const WORKER_PRIORITY: Priority = 1000;
pub const HANDLER_A_PRIORITY: Priority = 2000;
pub const HANDLER_B_PRIORITY: Priority = 3000;
pub const DEVICE_A_PRIORITY: Priority = 4000;
pub const DEVICE_B_PRIORITY: Priority = 5000;

/// Countdown of the idle task in the standard configuration.
pub const IDLE_COUNT: u32 = 1000;

pub const EXPECTED_QUEUE_COUNT: u64 = 2322;
pub const EXPECTED_HOLD_COUNT: u64 = 928;

/// Work packets initially queued at the worker.
const WORK_PACKETS: usize = 2;

/// Device packets initially queued at each handler.
const DEVICE_PACKETS: usize = 3;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Counter values a correct run must produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedCounts {
    pub queue_count: u64,
    pub hold_count: u64,
}

impl Default for ExpectedCounts {
    fn default() -> Self {
        Self {
            queue_count: EXPECTED_QUEUE_COUNT,
            hold_count: EXPECTED_HOLD_COUNT,
        }
    }
}

/// Parameters of one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Countdown of the idle task; the run ends when it reaches zero.
    pub idle_count: u32,
    pub expected: ExpectedCounts,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            idle_count: IDLE_COUNT,
            expected: ExpectedCounts::default(),
        }
    }
}

impl WorkloadConfig {
    pub fn validate(&self) -> Result<()> {
        if self.idle_count == 0 {
            return Err(KernelError::InvalidConfig {
                reason: "idle countdown must be at least 1".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Counters left behind by a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub queue_count: u64,
    pub hold_count: u64,
}

impl SimulationOutcome {
    /// Compare against the expected counters.  Any difference is fatal.
    pub fn verify(&self, expected: &ExpectedCounts) -> Result<()> {
        if self.queue_count != expected.queue_count || self.hold_count != expected.hold_count {
            return Err(KernelError::CounterMismatch {
                queue_count: self.queue_count,
                hold_count: self.hold_count,
                expected_queue_count: expected.queue_count,
                expected_hold_count: expected.hold_count,
            });
        }
        Ok(())
    }
}

/// Build `count` packets of `kind` addressed to `destination`.
fn packet_chain(count: usize, destination: TaskId, kind: PacketKind) -> PacketLink {
    (0..count).fold(None, |queue, _| Some(Packet::new(queue, destination, kind)))
}

/// Build the six-task graph, ready for [`Scheduler::schedule`].
pub fn build_scheduler(config: &WorkloadConfig) -> Result<Scheduler> {
    config.validate()?;

    let mut scheduler = Scheduler::new();
    scheduler.add_idle_task(IDLE, IDLE_PRIORITY, None, config.idle_count)?;
    scheduler.add_worker_task(
        WORKER,
        WORKER_PRIORITY,
        packet_chain(WORK_PACKETS, WORKER, PacketKind::Work),
    )?;
    scheduler.add_handler_task(
        HANDLER_A,
        HANDLER_A_PRIORITY,
        packet_chain(DEVICE_PACKETS, DEVICE_A, PacketKind::Device),
    )?;
    scheduler.add_handler_task(
        HANDLER_B,
        HANDLER_B_PRIORITY,
        packet_chain(DEVICE_PACKETS, DEVICE_B, PacketKind::Device),
    )?;
    scheduler.add_device_task(DEVICE_A, DEVICE_A_PRIORITY, None)?;
    scheduler.add_device_task(DEVICE_B, DEVICE_B_PRIORITY, None)?;
    Ok(scheduler)
}

/// Build the task graph, run it to completion and report the counters.
///
/// The outcome is not verified; see [`SimulationOutcome::verify`].
pub fn run_simulation(config: &WorkloadConfig) -> Result<SimulationOutcome> {
    let mut scheduler = build_scheduler(config)?;
    scheduler.schedule();
    Ok(SimulationOutcome {
        queue_count: scheduler.queue_count(),
        hold_count: scheduler.hold_count(),
    })
}

/// Run one simulation and verify it against the configured expectations.
pub fn run_richards(config: &WorkloadConfig) -> Result<SimulationOutcome> {
    let outcome = run_simulation(config)?;
    outcome.verify(&config.expected)?;
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
