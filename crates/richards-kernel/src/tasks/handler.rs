use crate::packet::{DATA_SIZE, PacketKind, PacketLink};
use crate::scheduler::{Scheduler, TaskId};

use super::Task;

/// Drains work packets one payload slot at a time through device packets.
///
/// Incoming packets are sorted into two FIFOs by kind.  Each dispatch either
/// sends the next payload datum out on a device packet, forwards a finished
/// work packet, or suspends when neither is possible.
#[derive(Debug, Default)]
pub struct HandlerTask {
    work: PacketLink,
    devices: PacketLink,
}

impl HandlerTask {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queued_work(&self) -> usize {
        self.work.as_deref().map_or(0, |p| p.iter().count())
    }

    pub fn queued_devices(&self) -> usize {
        self.devices.as_deref().map_or(0, |p| p.iter().count())
    }
}

impl Task for HandlerTask {
    fn run(&mut self, packet: PacketLink, scheduler: &mut Scheduler) -> Option<TaskId> {
        if let Some(packet) = packet {
            match packet.kind {
                PacketKind::Work => self.work = Some(packet.append_to(self.work.take())),
                PacketKind::Device => self.devices = Some(packet.append_to(self.devices.take())),
            }
        }

        let Some(cursor) = self.work.as_ref().map(|work| work.counter as usize) else {
            return scheduler.suspend_current();
        };

        if cursor < DATA_SIZE {
            if let Some(mut device) = self.devices.take() {
                self.devices = device.link.take();
                if let Some(work) = self.work.as_mut() {
                    device.counter = work.payload[cursor];
                    work.counter += 1;
                }
                return scheduler.queue(device);
            }
        } else if let Some(mut done) = self.work.take() {
            self.work = done.link.take();
            return scheduler.queue(done);
        }

        scheduler.suspend_current()
    }

    fn name(&self) -> &'static str {
        "HandlerTask"
    }
}
