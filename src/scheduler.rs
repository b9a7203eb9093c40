//! Deferred execution for promise reactions.
//!
//! A [`Scheduler`] must never run a job inside `schedule`, must start jobs in
//! the order they were scheduled, and must eventually run every job it
//! accepted.
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::{Error, Worker};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait Scheduler: Send + Sync {
    fn schedule(&self, job: Job) -> Result<(), Error>;
}

/// The process-wide scheduler used by [`Promise::new`](crate::Promise::new).
pub fn global() -> Arc<dyn Scheduler> {
    static GLOBAL: OnceLock<Arc<dyn Scheduler>> = OnceLock::new();
    GLOBAL
        .get_or_init(|| {
            let worker: Arc<dyn Scheduler> = Arc::new(Worker::new());
            worker
        })
        .clone()
}

/// An in-memory FIFO queue that only runs jobs when asked to.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use thenable::{MicrotaskQueue, Promise};
///
/// let queue = Arc::new(MicrotaskQueue::new());
/// let p: Promise<i32, ()> = Promise::resolved_in(queue.clone(), 1);
/// let doubled = p.and_then(|v| Ok((v * 2).into()));
/// assert!(doubled.is_pending());
/// assert_eq!(queue.run_until_idle(), 1);
/// assert_eq!(doubled.result(), Some(Ok(2)));
/// ```
#[derive(Default)]
pub struct MicrotaskQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Runs the oldest job, if any. Returns whether a job ran.
    pub fn run_next(&self) -> bool {
        let job = self.jobs.lock().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Runs jobs until the queue is empty, including jobs scheduled by the
    /// jobs themselves. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Scheduler for MicrotaskQueue {
    fn schedule(&self, job: Job) -> Result<(), Error> {
        self.jobs.lock().push_back(job);
        Ok(())
    }
}

impl fmt::Debug for MicrotaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrotaskQueue")
            .field("len", &self.len())
            .finish()
    }
}
