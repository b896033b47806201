use crate::packet::PacketLink;
use crate::scheduler::{Scheduler, TaskId};

use super::Task;

/// A slow peripheral that keeps at most one packet in flight.
///
/// A delivered packet is parked and the device holds itself; once released
/// and dispatched without input it hands the parked packet back.
#[derive(Debug, Default)]
pub struct DeviceTask {
    pending: PacketLink,
}

impl DeviceTask {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }
}

impl Task for DeviceTask {
    fn run(&mut self, packet: PacketLink, scheduler: &mut Scheduler) -> Option<TaskId> {
        match packet {
            None => match self.pending.take() {
                None => scheduler.suspend_current(),
                Some(parked) => scheduler.queue(parked),
            },
            Some(packet) => {
                self.pending = Some(packet);
                scheduler.hold_current()
            }
        }
    }

    fn name(&self) -> &'static str {
        "DeviceTask"
    }
}
