use crate::packet::PacketLink;
use crate::scheduler::{Scheduler, TaskId};
use crate::workload::{DEVICE_A, DEVICE_B};

use super::Task;

/// Feedback constant applied when the rotated-out bit is set.
const ROTATION_MASK: u32 = 53256;

/// Lowest-priority task that keeps releasing the two devices until its
/// countdown expires, then holds itself.
#[derive(Debug, Clone)]
pub struct IdleTask {
    rotation: u32,
    count: u32,
}

impl IdleTask {
    #[must_use]
    pub fn new(count: u32) -> Self {
        Self { rotation: 1, count }
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Task for IdleTask {
    fn run(&mut self, _packet: PacketLink, scheduler: &mut Scheduler) -> Option<TaskId> {
        self.count = self.count.saturating_sub(1);
        if self.count == 0 {
            return scheduler.hold_current();
        }

        if self.rotation & 1 == 0 {
            self.rotation >>= 1;
            scheduler.release(DEVICE_A)
        } else {
            self.rotation = (self.rotation >> 1) ^ ROTATION_MASK;
            scheduler.release(DEVICE_B)
        }
    }

    fn name(&self) -> &'static str {
        "IdleTask"
    }
}
