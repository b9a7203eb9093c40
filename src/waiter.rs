use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::Promise;

/// Waits for a [`Promise`] to settle. Any number of waiters may watch the
/// same promise; each gets its own copy of the outcome.
///
/// # Examples
///
/// ```
/// use thenable::Promise;
/// use futures::executor::block_on;
/// use std::thread;
/// let promise: Promise<String, String> = Promise::new(|resolve, _reject| {
///     thread::spawn(move || resolve.resolve("Hi".into()));
///     Ok(())
/// });
/// let waiter = promise.settled();
/// let task1 = thread::spawn(move || block_on(waiter));
/// assert_eq!(block_on(promise.settled()), Ok("Hi".to_string()));
/// assert_eq!(task1.join().expect("The task1 thread has panicked."), Ok("Hi".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct Waiter<T, E> {
    promise: Promise<T, E>,
}

impl<T, E> Waiter<T, E> {
    pub(crate) fn new(promise: Promise<T, E>) -> Self {
        Self { promise }
    }
}

impl<T, E> Future for Waiter<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.promise.poll_settled(cx)
    }
}
