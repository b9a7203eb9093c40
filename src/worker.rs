//! A worker scheduler uses a multi-producer, single-consumer channel as its
//! backend. Jobs are sent from any thread and run in order on one dedicated
//! thread, which is spawned on first use.
//!
use crate::scheduler::{Job, Scheduler};
use crate::Error;
use log::{debug, error};
use parking_lot::Mutex;
use std::{
    panic::{self, AssertUnwindSafe},
    sync::mpsc::{channel, Sender},
    thread,
};

const DEFAULT_NAME: &str = "thenable-worker";

/// Worker configuration.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    name: Option<String>,
    stack_size: Option<usize>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    pub fn build(self) -> Worker {
        Worker {
            config: self,
            sender: Mutex::new(None),
        }
    }

    fn spawn(&self) -> Result<Sender<Job>, Error> {
        let (tx, rx) = channel::<Job>();
        let name = self.name.clone().unwrap_or_else(|| DEFAULT_NAME.into());
        let mut builder = thread::Builder::new().name(name.clone());
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        builder.spawn(move || {
            for job in rx {
                // A panicking job must not take the rest of the queue with it.
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!("job on {name} panicked");
                }
            }
            debug!("{name} queue closed");
        })?;
        Ok(tx)
    }
}

/// A [`Scheduler`] running jobs in FIFO order on its own thread.
///
/// A job that panics is caught and logged, and the worker moves on to the
/// next job. When that job was a promise reaction, the derived promise is
/// never settled: it stays pending and anything awaiting it waits forever.
/// Report failures from reactions by returning `Err` instead of panicking.
#[derive(Debug)]
pub struct Worker {
    config: Builder,
    sender: Mutex<Option<Sender<Job>>>,
}

impl Worker {
    pub fn new() -> Self {
        Builder::new().build()
    }

    pub fn builder() -> Builder {
        Builder::new()
    }
}

impl Default for Worker {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for Worker {
    fn schedule(&self, job: Job) -> Result<(), Error> {
        let mut sender = self.sender.lock();
        if sender.is_none() {
            *sender = Some(self.config.spawn()?);
        }
        match sender.as_ref() {
            Some(tx) => tx.send(job).map_err(|_| Error::SchedulerClosed),
            None => Err(Error::SchedulerClosed),
        }
    }
}
