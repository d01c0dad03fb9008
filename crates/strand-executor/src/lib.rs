//! `strand-executor`: single-threaded active-object executor.
//!
//! # Overview
//!
//! An [`Executor`] owns one worker thread and runs every task handed to it
//! on that thread, one at a time. Callers on any thread can:
//!
//! | Operation                         | Behaviour                                         |
//! |-----------------------------------|---------------------------------------------------|
//! | `submit_blocking`                 | run now (FIFO), wait for the result               |
//! | `submit_async`                    | run now (FIFO), get a [`TaskFuture`]              |
//! | `synchronize`                     | wait until earlier work has finished              |
//! | `schedule_at` / `schedule_after`  | run once at a deadline                            |
//! | `schedule_every(_from)`           | run repeatedly at a fixed cadence                 |
//! | `cancel` / [`ScheduledHandle`]    | stop a scheduled call                             |
//!
//! Immediate work always runs before scheduled work that is not yet due; a
//! due scheduled call runs as soon as no immediate work is waiting.
//!
//! The building blocks are public too: [`GuardedNotify`] (a monitor),
//! [`SynchronizedQueue`] (a blocking, optionally bounded FIFO) and
//! [`ScheduledCalls`] (the deadline-ordered registry).

pub mod executor;
pub mod future;
pub mod guarded;
pub mod handle;
pub mod queue;
pub mod scheduled;
mod worker;

pub use executor::{Executor, ExecutorBuilder, PanicHook, TaskPanic};
pub use future::TaskFuture;
pub use guarded::{Guarded, GuardedNotify};
pub use handle::ScheduledHandle;
pub use queue::SynchronizedQueue;
pub use scheduled::{ScheduledCall, ScheduledCalls};
pub use strand_core::{CallId, ExecutorConfig, Result, StrandError};
