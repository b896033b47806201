//! Task control blocks and their state flags.
//!
//! A [`TaskControlBlock`] is the scheduler's bookkeeping record for one task:
//! identity, priority, the inbound packet queue, the behavior that runs when
//! the task is dispatched, and a small set of state bits.
//!
//! # State bits
//!
//! ```text
//! RUNNING            = 0b000
//! RUNNABLE           = 0b001
//! SUSPENDED          = 0b010
//! SUSPENDED_RUNNABLE = 0b011
//! HELD               = 0b100
//! ```
//!
//! A task is skipped by the run loop when it is held, or when it is suspended
//! with nothing else set.  `SUSPENDED_RUNNABLE` is dispatchable: a packet
//! arrived after the task suspended itself.

use std::fmt;

use bitflags::bitflags;

use crate::packet::{Packet, PacketLink};
use crate::scheduler::TaskId;
use crate::tasks::Task;

/// Scheduling priority.  Higher values win.
pub type Priority = u32;

bitflags! {
    /// Scheduling state of a task.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TaskState: u8 {
        /// The task has at least one queued packet to consume.
        const RUNNABLE = 0b001;
        /// The task has no input it wants to process.
        const SUSPENDED = 0b010;
        /// The task paused itself and waits for an explicit release.
        const HELD = 0b100;
        const SUSPENDED_RUNNABLE = Self::SUSPENDED.bits() | Self::RUNNABLE.bits();
    }
}

impl TaskState {
    /// No flags set: the task is executing or about to resume.
    pub const RUNNING: Self = Self::empty();
}

/// Per-task bookkeeping record owned by the [`Scheduler`](crate::Scheduler).
pub struct TaskControlBlock {
    /// Previously created task; the scheduler's traversal list.
    pub(crate) link: Option<TaskId>,
    id: TaskId,
    priority: Priority,
    queue: PacketLink,
    /// Taken out while the behavior runs so it can borrow the scheduler.
    pub(crate) task: Option<Box<dyn Task>>,
    state: TaskState,
}

impl TaskControlBlock {
    /// Create a control block.  A non-empty initial queue starts the task as
    /// `SUSPENDED_RUNNABLE`, an empty one as `SUSPENDED`.
    pub fn new(
        link: Option<TaskId>,
        id: TaskId,
        priority: Priority,
        queue: PacketLink,
        task: Box<dyn Task>,
    ) -> Self {
        let state = if queue.is_some() {
            TaskState::SUSPENDED_RUNNABLE
        } else {
            TaskState::SUSPENDED
        };
        Self {
            link,
            id,
            priority,
            queue,
            task: Some(task),
            state,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Next task in the scheduler's traversal list.
    pub fn link(&self) -> Option<TaskId> {
        self.link
    }

    /// Name of the behavior, or `"?"` while it is being dispatched.
    pub fn task_name(&self) -> &'static str {
        self.task.as_ref().map_or("?", |task| task.name())
    }

    /// Iterate over the packets waiting in the inbound queue.
    pub fn pending(&self) -> impl Iterator<Item = &Packet> {
        self.queue.as_deref().into_iter().flat_map(Packet::iter)
    }

    // -- State transitions --------------------------------------------------

    pub fn set_running(&mut self) {
        self.state = TaskState::RUNNING;
    }

    pub fn mark_held(&mut self) {
        self.state.insert(TaskState::HELD);
    }

    pub fn mark_not_held(&mut self) {
        self.state.remove(TaskState::HELD);
    }

    pub fn mark_suspended(&mut self) {
        self.state.insert(TaskState::SUSPENDED);
    }

    pub fn mark_runnable(&mut self) {
        self.state.insert(TaskState::RUNNABLE);
    }

    /// Whether the run loop must skip this task.
    ///
    /// The suspended test is an exact comparison: a suspended task that has
    /// since become runnable must still be dispatched.
    pub fn is_held_or_suspended(&self) -> bool {
        self.state.contains(TaskState::HELD) || self.state == TaskState::SUSPENDED
    }

    // -- Dispatch -----------------------------------------------------------

    /// Pop the packet the behavior should be dispatched with, if any.
    ///
    /// Only a `SUSPENDED_RUNNABLE` task consumes input.  Afterwards the task
    /// is `RUNNING` when its queue drained and `RUNNABLE` otherwise.
    pub fn take_packet(&mut self) -> PacketLink {
        if self.state != TaskState::SUSPENDED_RUNNABLE {
            return None;
        }

        let mut packet = self.queue.take()?;
        self.queue = packet.link.take();
        self.state = if self.queue.is_none() {
            TaskState::RUNNING
        } else {
            TaskState::RUNNABLE
        };
        Some(packet)
    }

    /// Admit `packet` to the inbound queue and decide who runs next.
    ///
    /// Only the transition from an empty queue can preempt: the task becomes
    /// runnable and wins over `caller` when its priority is strictly higher.
    /// A packet landing behind others is appended and `caller` keeps running.
    pub fn check_priority_add(
        &mut self,
        caller: TaskId,
        caller_priority: Priority,
        packet: Box<Packet>,
    ) -> TaskId {
        if self.queue.is_none() {
            self.queue = Some(packet.append_to(None));
            self.mark_runnable();
            if self.priority > caller_priority {
                return self.id;
            }
        } else {
            self.queue = Some(packet.append_to(self.queue.take()));
        }
        caller
    }
}

impl fmt::Debug for TaskControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskControlBlock")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("task", &self.task_name())
            .field("state", &self.state)
            .field("link", &self.link)
            .field("queued", &self.pending().count())
            .finish()
    }
}

impl fmt::Display for TaskControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcb {{ {}@{} }}", self.task_name(), self.state.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketKind;
    use crate::tasks::IdleTask;

    fn block(id: TaskId, priority: Priority, queue: PacketLink) -> TaskControlBlock {
        TaskControlBlock::new(None, id, priority, queue, Box::new(IdleTask::new(1)))
    }

    fn tagged(counter: u32) -> Box<Packet> {
        let mut packet = Packet::new(None, 0, PacketKind::Work);
        packet.counter = counter;
        packet
    }

    #[test]
    fn initial_state_follows_queue() {
        assert_eq!(block(0, 0, None).state(), TaskState::SUSPENDED);
        let queued = block(0, 0, Some(tagged(1)));
        assert_eq!(queued.state(), TaskState::SUSPENDED_RUNNABLE);
    }

    #[test]
    fn state_bit_values() {
        assert_eq!(TaskState::RUNNING.bits(), 0);
        assert_eq!(TaskState::RUNNABLE.bits(), 1);
        assert_eq!(TaskState::SUSPENDED.bits(), 2);
        assert_eq!(TaskState::SUSPENDED_RUNNABLE.bits(), 3);
        assert_eq!(TaskState::HELD.bits(), 4);
    }

    #[test]
    fn suspended_runnable_is_schedulable() {
        let tcb = block(0, 0, Some(tagged(1)));
        assert!(!tcb.is_held_or_suspended());
    }

    #[test]
    fn plain_suspended_is_not_schedulable() {
        let tcb = block(0, 0, None);
        assert!(tcb.is_held_or_suspended());
    }

    #[test]
    fn held_bit_wins_over_everything() {
        let mut tcb = block(0, 0, Some(tagged(1)));
        tcb.mark_held();
        assert!(tcb.is_held_or_suspended());

        tcb.set_running();
        tcb.mark_runnable();
        tcb.mark_held();
        assert!(tcb.is_held_or_suspended());

        tcb.mark_not_held();
        assert_eq!(tcb.state(), TaskState::RUNNABLE);
        assert!(!tcb.is_held_or_suspended());
    }

    #[test]
    fn set_running_clears_all_flags() {
        let mut tcb = block(0, 0, Some(tagged(1)));
        tcb.mark_held();
        tcb.set_running();
        assert_eq!(tcb.state(), TaskState::RUNNING);
        assert!(!tcb.is_held_or_suspended());
    }

    #[test]
    fn take_packet_only_when_suspended_runnable() {
        let mut tcb = block(0, 0, Some(tagged(1)));
        tcb.set_running();
        assert!(tcb.take_packet().is_none());

        tcb.mark_runnable();
        assert!(tcb.take_packet().is_none());
        assert_eq!(tcb.pending().count(), 1);
    }

    #[test]
    fn take_packet_updates_state() {
        let mut queue = tagged(1).append_to(None);
        queue = tagged(2).append_to(Some(queue));
        let mut tcb = block(0, 0, Some(queue));

        let first = tcb.take_packet().expect("first packet");
        assert_eq!(first.counter, 1);
        assert!(first.link.is_none());
        assert_eq!(tcb.state(), TaskState::RUNNABLE);

        tcb.mark_suspended();
        let second = tcb.take_packet().expect("second packet");
        assert_eq!(second.counter, 2);
        assert_eq!(tcb.state(), TaskState::RUNNING);
    }

    #[test]
    fn equal_priority_does_not_preempt() {
        let mut target = block(1, 100, None);
        let next = target.check_priority_add(7, 100, tagged(1));
        assert_eq!(next, 7);
        assert_eq!(target.state(), TaskState::SUSPENDED_RUNNABLE);
    }

    #[test]
    fn higher_priority_preempts_on_first_packet() {
        let mut target = block(1, 200, None);
        let next = target.check_priority_add(7, 100, tagged(1));
        assert_eq!(next, 1);
    }

    #[test]
    fn non_empty_queue_never_preempts() {
        let mut target = block(1, 200, Some(tagged(1)));
        let next = target.check_priority_add(7, 100, tagged(2));
        assert_eq!(next, 7);
        let order: Vec<u32> = target.pending().map(|p| p.counter).collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn display_shows_name_and_state() {
        let tcb = block(0, 0, None);
        assert_eq!(tcb.to_string(), "tcb { IdleTask@2 }");
    }
}
