//! Kernel error types.
//!
//! The scheduler core has exactly two failure classes: setup data that cannot
//! form a valid task graph, and a finished run whose self-check counters do
//! not match the expected constants.  Unknown target ids during a run are not
//! errors at all; `queue` and `release` treat them as no-ops.

use crate::scheduler::TaskId;

/// Unified error type for the Richards kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    // -- Setup errors -------------------------------------------------------
    /// A task id does not fit the scheduler's id table.
    #[error("task id {id} out of range (table holds {capacity} ids)")]
    TaskIdOutOfRange { id: TaskId, capacity: usize },

    /// Two tasks were registered under the same id.
    #[error("task {id} is already registered")]
    DuplicateTask { id: TaskId },

    /// The workload configuration cannot produce a meaningful run.
    #[error("invalid workload configuration: {reason}")]
    InvalidConfig { reason: String },

    // -- Self-check errors --------------------------------------------------
    /// The post-run counters differ from the expected constants.  This
    /// indicates a scheduling defect and must never be retried.
    #[error(
        "error during execution: queue_count = {queue_count}, hold_count = {hold_count} \
         (expected {expected_queue_count} and {expected_hold_count})"
    )]
    CounterMismatch {
        queue_count: u64,
        hold_count: u64,
        expected_queue_count: u64,
        expected_hold_count: u64,
    },
}

/// Convenience alias used throughout the kernel crate.
pub type Result<T> = std::result::Result<T, KernelError>;
