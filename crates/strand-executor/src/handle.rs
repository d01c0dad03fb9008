use std::sync::Weak;

use strand_core::CallId;
use tracing::trace;

use crate::executor::Shared;

/// Capability to cancel one scheduled call.
///
/// The handle does not own the call and does not keep the executor alive.
/// Dropping it leaves the call scheduled. Only the first [`cancel`] has any
/// effect; later ones, cancels on a default handle and cancels after the
/// executor is gone do nothing.
///
/// [`cancel`]: ScheduledHandle::cancel
#[derive(Debug, Default)]
pub struct ScheduledHandle {
    executor: Weak<Shared>,
    id: Option<CallId>,
}

impl ScheduledHandle {
    pub(crate) fn new(executor: Weak<Shared>, id: CallId) -> Self {
        Self {
            executor,
            id: Some(id),
        }
    }

    /// Id of the call, until the handle is cancelled.
    pub fn id(&self) -> Option<CallId> {
        self.id
    }

    /// `true` once this handle can no longer affect its call.
    pub fn is_cancelled(&self) -> bool {
        self.id.is_none()
    }

    /// Ask the executor to drop the call.
    ///
    /// Off the worker thread this waits until the removal has run. A call
    /// whose deadline races with the cancel may still fire one more time.
    pub fn cancel(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        match self.executor.upgrade() {
            Some(shared) => shared.cancel(id),
            None => trace!(call_id = %id, "executor gone; nothing to cancel"),
        }
    }
}
