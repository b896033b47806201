//! Task behaviors.
//!
//! Every behavior implements [`Task`]: given an optional incoming packet it
//! performs one step of work, calling back into the [`Scheduler`] to queue,
//! release, hold or suspend, and returns the task the run loop should visit
//! next.  Behaviors share no implementation; the trait is the whole seam.

mod device;
mod handler;
mod idle;
mod worker;

pub use device::DeviceTask;
pub use handler::HandlerTask;
pub use idle::IdleTask;
pub use worker::WorkerTask;

use std::fmt;

use crate::packet::PacketLink;
use crate::scheduler::{Scheduler, TaskId};

/// One step of a task's work.
pub trait Task: fmt::Debug {
    /// Run once with the packet popped from the inbound queue (if any) and
    /// return the next task to visit.  `None` ends the current pass.
    fn run(&mut self, packet: PacketLink, scheduler: &mut Scheduler) -> Option<TaskId>;

    /// Short name used in logs and `Display` output.
    fn name(&self) -> &'static str;
}
