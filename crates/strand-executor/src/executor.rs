use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use strand_core::config::DEFAULT_THREAD_NAME;
use strand_core::{CallId, CallIdAllocator, Deadline, ExecutorConfig, Result, StrandError};
use tracing::{debug, error, info, warn};

use crate::future::{self, TaskFuture};
use crate::handle::ScheduledHandle;
use crate::queue::SynchronizedQueue;
use crate::scheduled::ScheduledCall;
use crate::worker;

/// Unit of immediate work queued for the worker.
pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// Callback told about every panic the worker contains.
pub type PanicHook = Arc<dyn Fn(&TaskPanic) + Send + Sync + 'static>;

/// A panic raised by work whose result nobody can observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPanic {
    /// Set when the panicking task was a scheduled call.
    pub call_id: Option<CallId>,
    pub message: String,
}

/// State shared by the executor, its worker thread and its handles.
pub(crate) struct Shared {
    queue: SynchronizedQueue<Task>,
    thread_id: OnceLock<ThreadId>,
    call_ids: CallIdAllocator,
    terminated: AtomicBool,
    on_task_panic: Option<PanicHook>,
}

impl Shared {
    pub(crate) fn queue(&self) -> &SynchronizedQueue<Task> {
        &self.queue
    }

    pub(crate) fn panic_hook(&self) -> Option<&PanicHook> {
        self.on_task_panic.as_ref()
    }

    pub(crate) fn is_executor_thread(&self) -> bool {
        self.thread_id.get() == Some(&thread::current().id())
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    /// Queue `task` for the worker.
    ///
    /// Fails once the worker is gone. A task that loses the race with
    /// termination is dropped, which resolves any result channel it carries
    /// with `Shutdown`.
    fn enqueue(&self, task: Task) -> Result<()> {
        if self.is_terminated() {
            return Err(StrandError::Shutdown);
        }
        self.queue.push(task);
        if self.is_terminated() {
            self.discard_pending();
        }
        Ok(())
    }

    /// Drop everything still queued. The tasks are dropped outside the lock.
    pub(crate) fn discard_pending(&self) {
        let discarded = self.queue.drain();
        if !discarded.is_empty() {
            debug!(count = discarded.len(), "discarding tasks queued after shutdown");
        }
    }

    fn submit_blocking<F, R>(&self, function: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_executor_thread() {
            if cfg!(debug_assertions) {
                panic!("submit_blocking on the executor's own thread would deadlock");
            }
            warn!("submit_blocking on the executor's own thread; running inline");
            return panic::catch_unwind(AssertUnwindSafe(function))
                .map_err(|payload| StrandError::from_panic(payload.as_ref()));
        }

        let (task, future) = future::package(function);
        self.enqueue(task)?;
        future.wait()
    }

    pub(crate) fn cancel(&self, id: CallId) {
        if self.is_executor_thread() {
            let removed = worker::with_scheduled(|calls| calls.remove(id));
            debug!(call_id = %id, removed = removed.is_some(), "scheduled call cancelled");
            if removed.is_none() {
                // The registration may still be queued behind the running
                // task; a removal queued now runs after it.
                let retry: Task = Box::new(move || {
                    let removed = worker::with_scheduled(|calls| calls.remove(id));
                    debug!(call_id = %id, removed = removed.is_some(), "deferred cancel ran");
                });
                if let Err(err) = self.enqueue(retry) {
                    debug!(call_id = %id, error = %err, "deferred cancel skipped");
                }
            }
            return;
        }

        let result = self.submit_blocking(move || {
            let removed = worker::with_scheduled(|calls| calls.remove(id));
            removed.is_some()
        });
        match result {
            Ok(removed) => debug!(call_id = %id, removed, "scheduled call cancelled"),
            Err(err) => debug!(call_id = %id, error = %err, "cancel skipped"),
        }
    }
}

/// Builder for an [`Executor`] with a custom worker thread or panic hook.
pub struct ExecutorBuilder {
    thread_name: String,
    stack_size: Option<usize>,
    on_task_panic: Option<PanicHook>,
}

impl Default for ExecutorBuilder {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            stack_size: None,
            on_task_panic: None,
        }
    }
}

impl ExecutorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self {
            thread_name: config.thread_name.clone(),
            stack_size: config.stack_size,
            on_task_panic: None,
        }
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Called on the worker thread whenever a task with no observer panics.
    pub fn on_task_panic(mut self, hook: impl Fn(&TaskPanic) + Send + Sync + 'static) -> Self {
        self.on_task_panic = Some(Arc::new(hook));
        self
    }

    /// Spawn the worker and wait until it is running.
    pub fn build(self) -> Result<Executor> {
        let shared = Arc::new(Shared {
            queue: SynchronizedQueue::new(),
            thread_id: OnceLock::new(),
            call_ids: CallIdAllocator::new(),
            terminated: AtomicBool::new(false),
            on_task_panic: self.on_task_panic,
        });

        let mut builder = thread::Builder::new().name(self.thread_name.clone());
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }

        // The worker records its identity before construction returns, so
        // `is_executor_thread` is exact from the first call on.
        let started = Arc::new(Barrier::new(2));
        let thread = {
            let shared = Arc::clone(&shared);
            let started = Arc::clone(&started);
            builder.spawn(move || {
                let _ = shared.thread_id.set(thread::current().id());
                started.wait();
                worker::run(&shared);
            })?
        };
        started.wait();

        info!(thread = %self.thread_name, "executor started");
        Ok(Executor {
            shared,
            thread: Some(thread),
            thread_name: self.thread_name,
        })
    }
}

/// Runs closures one at a time on a dedicated worker thread.
///
/// Work arrives two ways: immediately, in FIFO order, through
/// [`submit_blocking`](Self::submit_blocking) and
/// [`submit_async`](Self::submit_async); or at a deadline, through the
/// `schedule_*` family. No two tasks ever run concurrently, so state touched
/// only from tasks of one executor needs no further locking.
///
/// Dropping the executor runs every task queued before the drop, then stops
/// and joins the worker. Scheduled calls that have not fired yet are dropped.
pub struct Executor {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
    thread_name: String,
}

impl Executor {
    /// Executor with a default-configured worker thread.
    pub fn new() -> Result<Self> {
        ExecutorBuilder::new().build()
    }

    pub fn with_config(config: &ExecutorConfig) -> Result<Self> {
        ExecutorBuilder::from_config(config).build()
    }

    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::new()
    }

    /// Whether the caller is running on this executor's worker thread.
    pub fn is_executor_thread(&self) -> bool {
        self.shared.is_executor_thread()
    }

    /// Run `function` on the worker thread and wait for its result.
    ///
    /// A panic in `function` is returned as [`StrandError::TaskPanicked`].
    ///
    /// Calling this from the worker thread itself is a bug: it would wait on
    /// itself forever. Debug builds panic; release builds run `function`
    /// inline, outside the executor's serialization.
    pub fn submit_blocking<F, R>(&self, function: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.shared.submit_blocking(function)
    }

    /// Queue `function` and return at once with a future for its result.
    pub fn submit_async<F, R>(&self, function: F) -> TaskFuture<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (task, future) = future::package(function);
        // A rejected task is dropped, which resolves the future with Shutdown.
        let _ = self.shared.enqueue(task);
        future
    }

    /// Wait until every task queued before this call has finished.
    ///
    /// Same restriction as [`submit_blocking`](Self::submit_blocking): never
    /// call it from the worker thread.
    pub fn synchronize(&self) -> Result<()> {
        self.submit_blocking(|| ())
    }

    /// Run `function` once at `deadline`, or as soon as possible after it.
    ///
    /// Registration itself is queued like any immediate task, so it takes
    /// effect after the work submitted before it.
    pub fn schedule_at<F>(&self, deadline: Deadline, function: F) -> ScheduledHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.shared.call_ids.next_id();
        self.register(id, move || ScheduledCall::once(id, deadline, function))
    }

    /// Run `function` once after `delay`.
    pub fn schedule_after<F>(&self, delay: Duration, function: F) -> ScheduledHandle
    where
        F: FnOnce() + Send + 'static,
    {
        match Instant::now().checked_add(delay) {
            Some(deadline) => self.schedule_at(deadline, function),
            None => self.unreachable_deadline(),
        }
    }

    /// Run `function` every `interval`, starting one interval from now.
    pub fn schedule_every<F>(&self, interval: Duration, function: F) -> ScheduledHandle
    where
        F: FnMut() + Send + 'static,
    {
        match Instant::now().checked_add(interval) {
            Some(first) => self.schedule_every_from(first, interval, function),
            None => self.unreachable_deadline(),
        }
    }

    /// Run `function` at `first_deadline` and then every `interval`.
    ///
    /// Each deadline is the previous deadline plus `interval`, so the cadence
    /// does not drift. When the worker falls behind, overdue occurrences run
    /// back to back until it has caught up.
    pub fn schedule_every_from<F>(
        &self,
        first_deadline: Deadline,
        interval: Duration,
        function: F,
    ) -> ScheduledHandle
    where
        F: FnMut() + Send + 'static,
    {
        debug_assert!(!interval.is_zero(), "repeat interval must be non-zero");
        let id = self.shared.call_ids.next_id();
        self.register(id, move || {
            ScheduledCall::repeating(id, first_deadline, interval, function)
        })
    }

    /// Stop the scheduled call `id` from firing again.
    ///
    /// Unknown, fired or already cancelled ids are ignored. From another
    /// thread this waits for the worker, so once it returns the call will not
    /// start again; a run already in progress is not interrupted.
    pub fn cancel(&self, id: CallId) {
        self.shared.cancel(id);
    }

    fn register(
        &self,
        id: CallId,
        build: impl FnOnce() -> ScheduledCall + Send + 'static,
    ) -> ScheduledHandle {
        let task: Task = Box::new(move || {
            let call = build();
            let due_in = call.deadline().saturating_duration_since(Instant::now());
            debug!(
                call_id = %id,
                due_in_ms = due_in.as_millis() as u64,
                repeat_ms = call.repeat_interval().as_millis() as u64,
                "scheduled call registered"
            );
            worker::with_scheduled(|calls| calls.insert(call));
        });
        if let Err(err) = self.shared.enqueue(task) {
            debug!(call_id = %id, error = %err, "scheduled call rejected");
        }
        ScheduledHandle::new(Arc::downgrade(&self.shared), id)
    }

    /// Handle for a call whose deadline lies beyond the clock's range: it
    /// could never fire, so it is not registered.
    fn unreachable_deadline(&self) -> ScheduledHandle {
        let id = self.shared.call_ids.next_id();
        debug!(call_id = %id, "deadline out of clock range; call never fires");
        ScheduledHandle::new(Arc::downgrade(&self.shared), id)
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("thread_name", &self.thread_name)
            .field("thread_id", &self.shared.thread_id.get())
            .field("queued", &self.shared.queue.len())
            .finish()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        if self.shared.is_executor_thread() {
            // Joining ourselves would deadlock: stop after the current task
            // and let the thread exit on its own.
            warn!(
                thread = %self.thread_name,
                "executor dropped on its own worker thread; detaching"
            );
            self.shared.terminate();
            worker::request_stop();
            return;
        }

        // Queued behind all earlier work, so none of it is lost.
        let _ = self.shared.enqueue(Box::new(worker::request_stop));
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!(thread = %self.thread_name, "executor thread panicked");
            }
        }
        self.shared.terminate();
        self.shared.discard_pending();
        info!(thread = %self.thread_name, "executor stopped");
    }
}
