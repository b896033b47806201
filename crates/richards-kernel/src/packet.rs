//! Packets and their intrusive FIFO chains.
//!
//! A [`Packet`] is the unit of work passed between tasks.  Queues are plain
//! singly-linked chains of boxed packets: the head owns the rest of the chain
//! through [`Packet::link`].  Packets are allocated once while the task graph
//! is built and afterwards only ever move from one chain to another.

use serde::{Deserialize, Serialize};

use crate::scheduler::TaskId;

/// Number of payload slots carried by every packet.
pub const DATA_SIZE: usize = 4;

/// Owning link to the next packet of a chain.
pub type PacketLink = Option<Box<Packet>>;

/// What a packet is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    /// Round-trips between a handler and its device.
    Device,
    /// Carries a payload from the worker to a handler.
    Work,
}

/// A unit of data queued at a task.
#[derive(Debug)]
pub struct Packet {
    /// Next packet in whichever queue currently owns this one.
    pub link: PacketLink,
    /// Task the packet is addressed to.  Rewritten on every hand-off to the
    /// id of the sender so replies route back.
    pub destination: TaskId,
    pub kind: PacketKind,
    /// Processing cursor for work packets, transferred datum for device
    /// packets.
    pub counter: u32,
    pub payload: [u32; DATA_SIZE],
}

impl Packet {
    /// Create a packet in front of `link`.
    ///
    /// Chaining `new` calls prepends, which is how initial queues are built.
    #[must_use]
    pub fn new(link: PacketLink, destination: TaskId, kind: PacketKind) -> Box<Self> {
        Box::new(Self {
            link,
            destination,
            kind,
            counter: 0,
            payload: [0; DATA_SIZE],
        })
    }

    /// Append this packet to the end of `queue` and return the new head.
    ///
    /// The packet is detached from any chain it was still pointing into.
    #[must_use]
    pub fn append_to(mut self: Box<Self>, queue: PacketLink) -> Box<Self> {
        self.link = None;
        let Some(mut head) = queue else {
            return self;
        };

        let mut tail = &mut head.link;
        while let Some(node) = tail {
            tail = &mut node.link;
        }
        *tail = Some(self);
        head
    }

    /// Iterate over this packet and every packet linked after it.
    pub fn iter(&self) -> Iter<'_> {
        Iter { next: Some(self) }
    }
}

/// Borrowing iterator over a packet chain.
pub struct Iter<'a> {
    next: Option<&'a Packet>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Packet;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.link.as_deref();
        Some(current)
    }
}
