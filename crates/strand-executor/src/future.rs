//! Result channel between a submitted task and whoever waits on it.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, Thread};

use strand_core::{Result, StrandError};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::warn;

use crate::executor::Task;

/// Eventual result of a task submitted with
/// [`Executor::submit_async`](crate::Executor::submit_async).
///
/// Resolves to the task's return value, to [`StrandError::TaskPanicked`] if
/// the task panicked, or to [`StrandError::Shutdown`] if the executor dropped
/// the task without running it. Dropping the future does not cancel the task.
///
/// The future can be awaited from async code or waited on from a plain
/// thread with [`wait`](Self::wait).
#[derive(Debug)]
#[must_use = "dropping a TaskFuture discards the task's result"]
pub struct TaskFuture<R> {
    receiver: oneshot::Receiver<Result<R>>,
}

impl<R> TaskFuture<R> {
    /// Block the calling thread until the task has run.
    ///
    /// Works from any thread, including one that is driving an async runtime;
    /// the runtime is stalled for the duration, so prefer `.await` there.
    pub fn wait(self) -> Result<R> {
        let waker = Waker::from(Arc::new(Unparker(thread::current())));
        let mut cx = Context::from_waker(&waker);
        // Outside the runtime's cooperative budget: an exhausted budget would
        // report Pending forever while this thread never yields.
        let mut receiver = tokio::task::unconstrained(self);
        loop {
            match Pin::new(&mut receiver).poll(&mut cx) {
                Poll::Ready(result) => return result,
                // Spurious unparks just cost another poll.
                Poll::Pending => thread::park(),
            }
        }
    }

    /// Take the result if the task already ran, without blocking.
    ///
    /// Returns `None` while the task is pending. Once the result has been
    /// taken, later calls report `Shutdown`.
    pub fn try_wait(&mut self) -> Option<Result<R>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(StrandError::Shutdown)),
        }
    }
}

impl<R> Future for TaskFuture<R> {
    type Output = Result<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(StrandError::Shutdown)))
    }
}

/// Wakes a thread parked in [`TaskFuture::wait`].
struct Unparker(Thread);

impl Wake for Unparker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}

/// Wrap `function` into a queueable task whose outcome, panic included, is
/// delivered through the returned future.
pub(crate) fn package<F, R>(function: F) -> (Task, TaskFuture<R>)
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let task: Task = Box::new(move || {
        let result = panic::catch_unwind(AssertUnwindSafe(function))
            .map_err(|payload| StrandError::from_panic(payload.as_ref()));
        // The receiver may be gone: the caller dropped the future.
        if let Err(Err(err)) = sender.send(result) {
            warn!(error = %err, "task failed and nobody awaited its result");
        }
    });
    (task, TaskFuture { receiver })
}
