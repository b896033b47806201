//! Richards scheduling kernel.
//!
//! A deterministic, priority-preemptive cooperative scheduler that moves
//! packets between a fixed set of synthetic tasks:
//!
//! - **[`packet`]** -- Boxed packets and their singly-linked FIFO chains.
//! - **[`task`]** -- Task control blocks, state flags and queue admission.
//! - **[`tasks`]** -- The idle, device, worker and handler behaviors behind
//!   the [`Task`] trait.
//! - **[`scheduler`]** -- The run loop and the callbacks behaviors use to
//!   queue, release, hold and suspend.
//! - **[`workload`]** -- The standard six-task graph and its counter
//!   self-check.
//! - **[`error`]** -- Kernel error types via [`thiserror`].
//!
//! Everything here is synchronous and single-threaded; one [`Scheduler`] is
//! one simulation run.

pub mod error;
pub mod packet;
pub mod scheduler;
pub mod task;
pub mod tasks;
pub mod workload;

// Re-export the most commonly used types at the crate root for convenience.
pub use error::{KernelError, Result};
pub use packet::{DATA_SIZE, Packet, PacketKind, PacketLink};
pub use scheduler::{Scheduler, TaskId};
pub use task::{Priority, TaskControlBlock, TaskState};
pub use tasks::{DeviceTask, HandlerTask, IdleTask, Task, WorkerTask};
pub use workload::{
    ExpectedCounts, SimulationOutcome, WorkloadConfig, build_scheduler, run_richards,
    run_simulation,
};
