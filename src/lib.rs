//! Single-assignment promises with FIFO reactions.
//!
//! A [`Promise`] starts pending and settles exactly once, either fulfilled
//! with a value or rejected with a reason. Reactions registered with
//! [`Promise::then`] are handed to a [`Scheduler`] once the promise settles,
//! one job per reaction, in registration order. They never run inline.
//!
//! A reaction returning [`Resolution::Adopt`] makes the derived promise
//! mirror the outcome of any [`Thenable`], including another promise.
//!
//! ```
//! use std::sync::Arc;
//! use thenable::{MicrotaskQueue, Promise, Resolution, State};
//!
//! let queue = Arc::new(MicrotaskQueue::new());
//! let source: Promise<i32, String> = Promise::new_in(queue.clone(), |resolve, _reject| {
//!     resolve.resolve(1);
//!     Ok(())
//! });
//! let scheduler = queue.clone();
//! let derived = source
//!     .and_then(|value| Ok((value + 1).into()))
//!     .and_then(move |value| Ok(Resolution::adopt(Promise::resolved_in(scheduler, value * 10))));
//! assert_eq!(derived.state(), State::Pending);
//!
//! queue.run_until_idle();
//! assert_eq!(derived.result(), Some(Ok(20)));
//! ```
mod promise;
mod reaction;
mod resolution;
pub mod scheduler;
mod state;
mod waiter;
pub mod worker;

pub use promise::{Executor, Promise, Reject, Resolve};
pub use reaction::{OnFulfilled, OnRejected, Outcome};
pub use resolution::{Resolution, Thenable};
pub use scheduler::{Job, MicrotaskQueue, Scheduler};
pub use state::State;
pub use waiter::Waiter;
pub use worker::Worker;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A promise was constructed without an executor.
    #[error("promise executor is not callable")]
    NotCallable,
    #[error("scheduler no longer accepts jobs")]
    SchedulerClosed,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
