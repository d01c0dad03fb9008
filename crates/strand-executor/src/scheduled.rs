//! Deadline-ordered registry of one-shot and repeating calls.
//!
//! The registry belongs to the executor's worker thread and is never shared,
//! so it needs no lock and may hold `!Send` task handles.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use strand_core::{CallId, Deadline};

/// Task body of a scheduled call. Shared between the entry that just fired
/// and its rescheduled successor.
pub type ScheduledTask = Rc<RefCell<dyn FnMut()>>;

pub struct ScheduledCall {
    id: CallId,
    deadline: Deadline,
    repeat_interval: Duration,
    task: ScheduledTask,
}

impl ScheduledCall {
    /// A call that fires once at `deadline`.
    pub fn once(id: CallId, deadline: Deadline, task: impl FnOnce() + 'static) -> Self {
        let mut task = Some(task);
        Self::new(id, deadline, Duration::ZERO, move || {
            if let Some(task) = task.take() {
                task();
            }
        })
    }

    /// A call that fires at `deadline` and then every `interval`.
    ///
    /// A zero interval makes it a one-shot call.
    pub fn repeating(
        id: CallId,
        deadline: Deadline,
        interval: Duration,
        task: impl FnMut() + 'static,
    ) -> Self {
        Self::new(id, deadline, interval, task)
    }

    fn new(
        id: CallId,
        deadline: Deadline,
        repeat_interval: Duration,
        task: impl FnMut() + 'static,
    ) -> Self {
        Self {
            id,
            deadline,
            repeat_interval,
            task: Rc::new(RefCell::new(task)),
        }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    pub fn repeat_interval(&self) -> Duration {
        self.repeat_interval
    }

    pub fn is_repeating(&self) -> bool {
        !self.repeat_interval.is_zero()
    }

    /// Run the task body on the calling thread.
    pub fn run(&self) {
        let mut task = self.task.borrow_mut();
        (*task)();
    }

    /// The next occurrence: same id and task, deadline advanced from the
    /// previous *deadline*, not from now. `None` for one-shot calls, or when
    /// the next deadline is not representable.
    fn successor(&self) -> Option<ScheduledCall> {
        if !self.is_repeating() {
            return None;
        }
        let deadline = self.deadline.checked_add(self.repeat_interval)?;
        Some(ScheduledCall {
            id: self.id,
            deadline,
            repeat_interval: self.repeat_interval,
            task: Rc::clone(&self.task),
        })
    }
}

impl fmt::Debug for ScheduledCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledCall")
            .field("id", &self.id)
            .field("deadline", &self.deadline)
            .field("repeat_interval", &self.repeat_interval)
            .finish_non_exhaustive()
    }
}

/// Scheduled calls kept sorted so the soonest one is at the back.
///
/// Calls with equal deadlines fire in insertion order.
#[derive(Debug, Default)]
pub struct ScheduledCalls {
    // Descending by deadline; `last()` is due first.
    calls: Vec<ScheduledCall>,
}

impl ScheduledCalls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn contains(&self, id: CallId) -> bool {
        self.calls.iter().any(|call| call.id == id)
    }

    pub fn insert(&mut self, call: ScheduledCall) {
        // Place it before existing calls with the same deadline so those,
        // being older, are popped first.
        let at = self
            .calls
            .partition_point(|existing| existing.deadline > call.deadline);
        self.calls.insert(at, call);
    }

    /// Remove the call with `id` and hand it back, so the caller decides where
    /// its task is dropped. `None` if it already fired or was never registered.
    pub fn remove(&mut self, id: CallId) -> Option<ScheduledCall> {
        let index = self.calls.iter().position(|call| call.id == id)?;
        Some(self.calls.remove(index))
    }

    /// Deadline of the call due first, `None` when empty.
    pub fn next_deadline(&self) -> Option<Deadline> {
        self.calls.last().map(|call| call.deadline)
    }

    /// Take the call due first. A repeating call is reinserted right away at
    /// `fired_deadline + interval`; if that is already in the past it simply
    /// becomes due again, so a late executor catches up instead of drifting.
    pub fn pop_and_reschedule(&mut self) -> Option<ScheduledCall> {
        let call = self.calls.pop()?;
        if let Some(next) = call.successor() {
            self.insert(next);
        }
        Some(call)
    }
}
