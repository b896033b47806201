//! Priority-preemptive cooperative scheduler.
//!
//! The scheduler owns every [`TaskControlBlock`], indexed by id and threaded
//! into a traversal list in reverse creation order.  [`Scheduler::schedule`]
//! walks that list with an explicit cursor:
//!
//! - a held or suspended task is skipped and the cursor moves to its link;
//! - any other task is dispatched, and whatever task its behavior returns
//!   becomes the new cursor.
//!
//! Behaviors steer the cursor through the callbacks [`Scheduler::queue`],
//! [`Scheduler::release`], [`Scheduler::hold_current`] and
//! [`Scheduler::suspend_current`].  Returning a higher-priority task from one
//! of those callbacks is how preemption happens; there is no other mechanism.
//!
//! # Ownership
//!
//! Each run owns exactly one scheduler and one set of packets.  Nothing is
//! shared between runs, so independent simulations never interfere.

use crate::error::{KernelError, Result};
use crate::packet::{Packet, PacketLink};
use crate::task::{Priority, TaskControlBlock, TaskState};
use crate::tasks::{DeviceTask, HandlerTask, IdleTask, Task, WorkerTask};
use crate::workload::NUMBER_OF_IDS;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Task identifier.  Ids are dense and double as indices into the id table.
pub type TaskId = usize;

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Owner of the task graph and driver of the run loop.
pub struct Scheduler {
    /// Id table; `blocks[t.id]` is `t` for every registered task.
    blocks: Vec<Option<TaskControlBlock>>,

    /// Head of the traversal list (the most recently added task).
    list: Option<TaskId>,

    /// Task currently executing, and the run loop's cursor.
    current: Option<TaskId>,

    /// Task most recently dispatched; stamped onto queued packets.
    current_id: Option<TaskId>,

    queue_count: u64,
    hold_count: u64,
}

impl Scheduler {
    /// Create a scheduler sized for the standard workload's id set.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(NUMBER_OF_IDS)
    }

    /// Create a scheduler whose id table holds `capacity` ids.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            blocks: std::iter::repeat_with(|| None).take(capacity).collect(),
            list: None,
            current: None,
            current_id: None,
            queue_count: 0,
            hold_count: 0,
        }
    }

    // -- Setup --------------------------------------------------------------

    /// Register a task, push it onto the front of the traversal list and make
    /// it current.
    pub fn add_task(
        &mut self,
        id: TaskId,
        priority: Priority,
        queue: PacketLink,
        task: Box<dyn Task>,
    ) -> Result<()> {
        let capacity = self.blocks.len();
        let slot = self
            .blocks
            .get_mut(id)
            .ok_or(KernelError::TaskIdOutOfRange { id, capacity })?;
        if slot.is_some() {
            return Err(KernelError::DuplicateTask { id });
        }

        let tcb = TaskControlBlock::new(self.list, id, priority, queue, task);
        tracing::debug!(task_id = id, priority, task = %tcb, "task added");
        *slot = Some(tcb);
        self.list = Some(id);
        self.current = Some(id);
        Ok(())
    }

    /// Register a task that starts out running instead of suspended.
    pub fn add_running_task(
        &mut self,
        id: TaskId,
        priority: Priority,
        queue: PacketLink,
        task: Box<dyn Task>,
    ) -> Result<()> {
        self.add_task(id, priority, queue, task)?;
        if let Some(tcb) = self.block_mut(id) {
            tcb.set_running();
        }
        Ok(())
    }

    pub fn add_idle_task(
        &mut self,
        id: TaskId,
        priority: Priority,
        queue: PacketLink,
        count: u32,
    ) -> Result<()> {
        self.add_running_task(id, priority, queue, Box::new(IdleTask::new(count)))
    }

    pub fn add_worker_task(
        &mut self,
        id: TaskId,
        priority: Priority,
        queue: PacketLink,
    ) -> Result<()> {
        self.add_task(id, priority, queue, Box::new(WorkerTask::default()))
    }

    pub fn add_handler_task(
        &mut self,
        id: TaskId,
        priority: Priority,
        queue: PacketLink,
    ) -> Result<()> {
        self.add_task(id, priority, queue, Box::new(HandlerTask::new()))
    }

    pub fn add_device_task(
        &mut self,
        id: TaskId,
        priority: Priority,
        queue: PacketLink,
    ) -> Result<()> {
        self.add_task(id, priority, queue, Box::new(DeviceTask::new()))
    }

    // -- Run loop -----------------------------------------------------------

    /// Run until no task is left to dispatch from the cursor's position.
    pub fn schedule(&mut self) {
        self.current = self.list;
        while let Some(id) = self.current {
            let Some(tcb) = self.block_mut(id) else {
                self.current = None;
                break;
            };

            if tcb.is_held_or_suspended() {
                self.current = tcb.link;
            } else {
                self.current_id = Some(id);
                self.current = self.dispatch(id);
            }
        }

        tracing::debug!(
            queue_count = self.queue_count,
            hold_count = self.hold_count,
            "schedule loop drained"
        );
    }

    /// Run one step of task `id` and return the next cursor.
    fn dispatch(&mut self, id: TaskId) -> Option<TaskId> {
        let tcb = self.block_mut(id)?;
        let packet = tcb.take_packet();
        let mut task = tcb.task.take()?;

        let next = task.run(packet, self);

        if let Some(tcb) = self.block_mut(id) {
            tcb.task = Some(task);
        }
        next
    }

    // -- Callbacks used by task behaviors ------------------------------------

    /// Hand `packet` to the task it is addressed to.
    ///
    /// The packet is restamped with the sender's id so the receiver can reply.
    /// A packet addressed to an unknown task is discarded and no cursor is
    /// returned.
    pub fn queue(&mut self, mut packet: Box<Packet>) -> Option<TaskId> {
        let target = packet.destination;
        self.block(target)?;

        let (caller, caller_priority) = self.current_with_priority()?;
        self.queue_count += 1;
        packet.link = None;
        if let Some(sender) = self.current_id {
            packet.destination = sender;
        }

        let tcb = self.block_mut(target)?;
        Some(tcb.check_priority_add(caller, caller_priority, packet))
    }

    /// Clear the held flag of task `id`.
    ///
    /// Returns `id` when it outranks the current task, the current task
    /// otherwise, and nothing when `id` is unknown.
    pub fn release(&mut self, id: TaskId) -> Option<TaskId> {
        let current = self.current_with_priority();
        let tcb = self.block_mut(id)?;
        tcb.mark_not_held();

        match current {
            Some((current, priority)) if tcb.priority() <= priority => Some(current),
            _ => Some(id),
        }
    }

    /// Hold the current task and continue with its traversal-list successor.
    pub fn hold_current(&mut self) -> Option<TaskId> {
        self.hold_count += 1;
        let tcb = self.block_mut(self.current?)?;
        tcb.mark_held();
        tcb.link
    }

    /// Suspend the current task and keep it as the cursor.
    pub fn suspend_current(&mut self) -> Option<TaskId> {
        let id = self.current?;
        self.block_mut(id)?.mark_suspended();
        Some(id)
    }

    // -- Inspection ---------------------------------------------------------

    /// Number of packets handed off since the scheduler was created.
    pub fn queue_count(&self) -> u64 {
        self.queue_count
    }

    /// Number of times a task held itself.
    pub fn hold_count(&self) -> u64 {
        self.hold_count
    }

    /// The run loop's cursor.  `None` once [`Scheduler::schedule`] returned.
    pub fn current(&self) -> Option<TaskId> {
        self.current
    }

    pub fn task(&self, id: TaskId) -> Option<&TaskControlBlock> {
        self.block(id)
    }

    /// Tasks in traversal order (most recently added first).
    pub fn tasks(&self) -> impl Iterator<Item = &TaskControlBlock> {
        std::iter::successors(self.list.and_then(|id| self.block(id)), move |tcb| {
            tcb.link.and_then(|id| self.block(id))
        })
    }

    /// `(id, state)` pairs in traversal order.
    pub fn states(&self) -> Vec<(TaskId, TaskState)> {
        self.tasks().map(|tcb| (tcb.id(), tcb.state())).collect()
    }

    // -- Private helpers ----------------------------------------------------

    fn block(&self, id: TaskId) -> Option<&TaskControlBlock> {
        self.blocks.get(id).and_then(Option::as_ref)
    }

    fn block_mut(&mut self, id: TaskId) -> Option<&mut TaskControlBlock> {
        self.blocks.get_mut(id).and_then(Option::as_mut)
    }

    fn current_with_priority(&self) -> Option<(TaskId, Priority)> {
        let id = self.current?;
        self.block(id).map(|tcb| (id, tcb.priority()))
    }

    #[cfg(test)]
    pub(crate) fn set_current_for_test(&mut self, id: TaskId) {
        self.current = Some(id);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("list", &self.list)
            .field("current", &self.current)
            .field("current_id", &self.current_id)
            .field("queue_count", &self.queue_count)
            .field("hold_count", &self.hold_count)
            .field("tasks", &self.tasks().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketKind;

    /// Behavior that sends one packet to a fixed target, then suspends.
    #[derive(Debug)]
    struct Sender {
        target: TaskId,
        sent: bool,
    }

    impl Task for Sender {
        fn run(&mut self, _packet: PacketLink, scheduler: &mut Scheduler) -> Option<TaskId> {
            if self.sent {
                return scheduler.suspend_current();
            }
            self.sent = true;
            scheduler.queue(Packet::new(None, self.target, PacketKind::Work))
        }

        fn name(&self) -> &'static str {
            "Sender"
        }
    }

    /// Behavior that records each dispatch and suspends.
    #[derive(Debug, Default)]
    struct Sink;

    impl Task for Sink {
        fn run(&mut self, _packet: PacketLink, scheduler: &mut Scheduler) -> Option<TaskId> {
            scheduler.suspend_current()
        }

        fn name(&self) -> &'static str {
            "Sink"
        }
    }

    fn pair(target_priority: Priority, caller_priority: Priority) -> Scheduler {
        let mut scheduler = Scheduler::with_capacity(2);
        scheduler
            .add_task(0, target_priority, None, Box::new(Sink))
            .expect("target");
        scheduler
            .add_task(1, caller_priority, None, Box::new(Sink))
            .expect("caller");
        scheduler
    }

    #[test]
    fn add_task_links_in_reverse_order() {
        let mut scheduler = Scheduler::with_capacity(3);
        for id in 0..3 {
            scheduler.add_task(id, 0, None, Box::new(Sink)).expect("add");
        }
        let order: Vec<TaskId> = scheduler.tasks().map(TaskControlBlock::id).collect();
        assert_eq!(order, vec![2, 1, 0]);
        assert_eq!(scheduler.current(), Some(2));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut scheduler = Scheduler::with_capacity(2);
        scheduler.add_task(0, 0, None, Box::new(Sink)).expect("add");
        let err = scheduler.add_task(0, 0, None, Box::new(Sink)).unwrap_err();
        assert!(matches!(err, KernelError::DuplicateTask { id: 0 }));
    }

    #[test]
    fn out_of_range_id_is_rejected() {
        let mut scheduler = Scheduler::with_capacity(2);
        let err = scheduler.add_task(2, 0, None, Box::new(Sink)).unwrap_err();
        assert!(matches!(
            err,
            KernelError::TaskIdOutOfRange { id: 2, capacity: 2 }
        ));
    }

    #[test]
    fn running_task_starts_running() {
        let mut scheduler = Scheduler::with_capacity(1);
        scheduler
            .add_running_task(0, 0, None, Box::new(Sink))
            .expect("add");
        assert_eq!(scheduler.task(0).expect("task").state(), TaskState::RUNNING);
    }

    #[test]
    fn queue_with_equal_priority_keeps_caller() {
        let mut scheduler = pair(10, 10);
        let next = scheduler.queue(Packet::new(None, 0, PacketKind::Work));
        assert_eq!(next, Some(1));
        assert_eq!(scheduler.queue_count(), 1);
    }

    #[test]
    fn queue_to_higher_priority_preempts() {
        let mut scheduler = pair(20, 10);
        let next = scheduler.queue(Packet::new(None, 0, PacketKind::Work));
        assert_eq!(next, Some(0));
        assert_eq!(
            scheduler.task(0).expect("target").state(),
            TaskState::SUSPENDED_RUNNABLE
        );
    }

    #[test]
    fn queue_behind_pending_packets_appends() {
        let mut scheduler = pair(20, 10);
        for counter in 0..3 {
            let mut packet = Packet::new(None, 0, PacketKind::Work);
            packet.counter = counter;
            let next = scheduler.queue(packet);
            let expected = if counter == 0 { 0 } else { 1 };
            assert_eq!(next, Some(expected));
        }
        let order: Vec<u32> = scheduler
            .task(0)
            .expect("target")
            .pending()
            .map(|p| p.counter)
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn queue_to_unknown_task_is_a_no_op() {
        let mut scheduler = pair(10, 10);
        assert_eq!(scheduler.queue(Packet::new(None, 7, PacketKind::Work)), None);
        assert_eq!(scheduler.queue_count(), 0);
    }

    #[test]
    fn release_unknown_task_is_a_no_op() {
        let mut scheduler = pair(10, 10);
        assert_eq!(scheduler.release(9), None);
    }

    #[test]
    fn release_clears_held_and_compares_priority() {
        let mut scheduler = pair(20, 10);
        scheduler.set_current_for_test(0);
        scheduler.hold_current();
        assert!(scheduler.task(0).expect("t").state().contains(TaskState::HELD));

        scheduler.set_current_for_test(1);
        assert_eq!(scheduler.release(0), Some(0));
        assert!(!scheduler.task(0).expect("t").state().contains(TaskState::HELD));

        let mut scheduler = pair(10, 10);
        assert_eq!(scheduler.release(0), Some(1));
    }

    #[test]
    fn hold_current_returns_link() {
        let mut scheduler = pair(10, 10);
        assert_eq!(scheduler.hold_current(), Some(0));
        assert_eq!(scheduler.hold_count(), 1);
        assert!(scheduler.task(1).expect("t").is_held_or_suspended());
    }

    #[test]
    fn suspend_current_keeps_cursor() {
        let mut scheduler = pair(10, 10);
        assert_eq!(scheduler.suspend_current(), Some(1));
    }

    #[test]
    fn schedule_dispatches_sender_and_drains() {
        let mut scheduler = Scheduler::with_capacity(2);
        scheduler
            .add_task(0, 20, None, Box::new(Sink))
            .expect("sink");
        scheduler
            .add_running_task(
                1,
                10,
                None,
                Box::new(Sender {
                    target: 0,
                    sent: false,
                }),
            )
            .expect("sender");

        scheduler.schedule();

        assert_eq!(scheduler.current(), None);
        assert_eq!(scheduler.queue_count(), 1);
        // The sink consumed its packet and suspended at the tail of the
        // list, which ends the pass with the sender still running.
        assert_eq!(
            scheduler.states(),
            vec![(1, TaskState::RUNNING), (0, TaskState::SUSPENDED)]
        );
    }

    #[test]
    fn empty_scheduler_terminates() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule();
        assert_eq!(scheduler.current(), None);
        assert_eq!(scheduler.queue_count(), 0);
        assert_eq!(scheduler.hold_count(), 0);
    }
}
