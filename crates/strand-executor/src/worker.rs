//! The worker thread's run loop and its thread-local state.
//!
//! Everything here runs on an executor's worker thread only. The scheduled
//! registry lives in a thread-local, which keeps it single-writer without a
//! lock: each worker thread serves exactly one executor.

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};

use strand_core::error::panic_message;
use strand_core::CallId;
use tracing::{error, trace};

use crate::executor::{Shared, TaskPanic};
use crate::scheduled::ScheduledCalls;

struct WorkerContext {
    scheduled: RefCell<ScheduledCalls>,
    stopping: Cell<bool>,
}

thread_local! {
    static WORKER: WorkerContext = WorkerContext {
        scheduled: RefCell::new(ScheduledCalls::new()),
        stopping: Cell::new(false),
    };
}

/// Borrow the current worker's scheduled registry.
///
/// Must not be re-entered from `f`; task bodies never run inside it.
pub(crate) fn with_scheduled<R>(f: impl FnOnce(&mut ScheduledCalls) -> R) -> R {
    WORKER.with(|worker| f(&mut worker.scheduled.borrow_mut()))
}

/// Make the run loop exit after the task currently running.
pub(crate) fn request_stop() {
    WORKER.with(|worker| worker.stopping.set(true));
}

fn stopping() -> bool {
    WORKER.with(|worker| worker.stopping.get())
}

pub(crate) fn run(shared: &Shared) {
    while !stopping() {
        run_one(shared);
    }

    // Pending calls are dropped, not run. Take them out first so their
    // destructors run without the registry borrowed.
    let abandoned = with_scheduled(std::mem::take);
    if !abandoned.is_empty() {
        trace!(count = abandoned.len(), "dropping pending scheduled calls");
    }
    drop(abandoned);

    if shared.is_terminated() {
        shared.discard_pending();
    }
}

/// Run exactly one unit of work, waiting for it if necessary.
///
/// Immediate work wins over scheduled work that is not yet due. A scheduled
/// call fires once its deadline passes and the queue is still empty; a call
/// whose deadline is already behind us fires right away.
fn run_one(shared: &Shared) {
    let scheduled_due = match with_scheduled(|calls| calls.next_deadline()) {
        Some(deadline) => !shared.queue().wait_for_not_empty_until(deadline),
        None => false,
    };

    if !scheduled_due {
        let task = shared.queue().pop();
        contain(shared, None, task);
        return;
    }

    let Some(call) = with_scheduled(|calls| calls.pop_and_reschedule()) else {
        return;
    };
    if call.is_repeating() {
        trace!(call_id = %call.id(), "repeating call fired and rescheduled");
    }
    contain(shared, Some(call.id()), || call.run());
}

/// Run `task`, keeping a panic from unwinding out of the worker thread.
fn contain(shared: &Shared, call_id: Option<CallId>, task: impl FnOnce()) {
    let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) else {
        return;
    };

    let report = TaskPanic {
        call_id,
        message: panic_message(payload.as_ref()),
    };
    match report.call_id {
        Some(id) => error!(call_id = %id, panic = %report.message, "scheduled task panicked"),
        None => error!(panic = %report.message, "task panicked"),
    }

    if let Some(hook) = shared.panic_hook() {
        if panic::catch_unwind(AssertUnwindSafe(|| hook(&report))).is_err() {
            error!("task panic hook panicked");
        }
    }
}
