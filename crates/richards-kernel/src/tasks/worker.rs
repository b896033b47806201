use crate::packet::{DATA_SIZE, PacketLink};
use crate::scheduler::{Scheduler, TaskId};
use crate::workload::{HANDLER_A, HANDLER_B};

use super::Task;

/// Largest value written into a payload slot before wrapping back to 1.
const PAYLOAD_WRAP: u32 = 26;

/// Fills work packets and alternates them between the two handlers.
#[derive(Debug, Clone)]
pub struct WorkerTask {
    destination: TaskId,
    count: u32,
}

impl WorkerTask {
    #[must_use]
    pub fn new(destination: TaskId, count: u32) -> Self {
        Self { destination, count }
    }
}

impl Default for WorkerTask {
    fn default() -> Self {
        Self::new(HANDLER_A, 0)
    }
}

impl Task for WorkerTask {
    fn run(&mut self, packet: PacketLink, scheduler: &mut Scheduler) -> Option<TaskId> {
        let Some(mut packet) = packet else {
            return scheduler.suspend_current();
        };

        self.destination = if self.destination == HANDLER_A {
            HANDLER_B
        } else {
            HANDLER_A
        };
        packet.destination = self.destination;
        packet.counter = 0;
        for slot in packet.payload.iter_mut() {
            self.count += 1;
            if self.count > PAYLOAD_WRAP {
                self.count = 1;
            }
            *slot = self.count;
        }
        debug_assert_eq!(packet.payload.len(), DATA_SIZE);

        scheduler.queue(packet)
    }

    fn name(&self) -> &'static str {
        "WorkerTask"
    }
}
