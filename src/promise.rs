use std::collections::VecDeque;
use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use log::{debug, error, trace, warn};
use parking_lot::Mutex;

use crate::reaction::{OnFulfilled, OnRejected, Outcome, Reaction};
use crate::resolution::{Resolution, Thenable};
use crate::scheduler::{self, Scheduler};
use crate::state::{Settlement, State};
use crate::{Error, Waiter};

/// Executor accepted by [`Promise::try_new_in`].
pub type Executor<T, E> = Box<dyn FnOnce(Resolve<T, E>, Reject<T, E>) -> Result<(), E>>;

/// A single-assignment deferred result.
///
/// Cloning a `Promise` yields another handle to the same promise. Reactions
/// registered with [`then`](Promise::then) always run on the promise's
/// scheduler, never inline, and in registration order.
pub struct Promise<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
    scheduler: Arc<dyn Scheduler>,
}

struct Inner<T, E> {
    settlement: Settlement<T, E>,
    reactions: VecDeque<Reaction<T, E>>,
    wakers: Vec<Waker>,
}

impl<T, E> Drop for Inner<T, E> {
    /// Releases a pending chain level by level. Each queued reaction owns the
    /// next promise of the chain, so the default drop would recurse once per
    /// link.
    fn drop(&mut self) {
        let mut reactions: Vec<Reaction<T, E>> = self.reactions.drain(..).collect();
        while let Some(reaction) = reactions.pop() {
            let Reaction {
                on_fulfilled,
                on_rejected,
                resolve,
                reject,
            } = reaction;
            drop(on_fulfilled);
            drop(on_rejected);
            for promise in [resolve.promise, reject.promise] {
                if let Some(inner) = Arc::into_inner(promise.inner) {
                    let mut inner = inner.into_inner();
                    reactions.extend(inner.reactions.drain(..));
                }
            }
        }
    }
}

/// The fulfillment entry point of a promise.
pub struct Resolve<T, E> {
    promise: Promise<T, E>,
}

/// The rejection entry point of a promise.
pub struct Reject<T, E> {
    promise: Promise<T, E>,
}

impl<T, E> Promise<T, E> {
    pub fn state(&self) -> State {
        self.inner.lock().settlement.state()
    }

    pub fn is_pending(&self) -> bool {
        self.state().is_pending()
    }

    /// The scheduler reactions of this promise, and of every promise derived
    /// from it, are handed to.
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    fn ptr_eq(&self, other: &Promise<T, E>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a promise on the process-wide worker scheduler.
    ///
    /// The executor runs synchronously. Returning `Err(reason)` from it
    /// rejects the promise with `reason`, unless it already settled.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Resolve<T, E>, Reject<T, E>) -> Result<(), E>,
    {
        Self::new_in(scheduler::global(), executor)
    }

    pub fn new_in<F>(scheduler: Arc<dyn Scheduler>, executor: F) -> Self
    where
        F: FnOnce(Resolve<T, E>, Reject<T, E>) -> Result<(), E>,
    {
        let promise = Promise {
            inner: Arc::new(Mutex::new(Inner {
                settlement: Settlement::Pending,
                reactions: VecDeque::new(),
                wakers: vec![],
            })),
            scheduler,
        };
        if let Err(reason) = executor(promise.resolver(), promise.rejecter()) {
            trace!("executor failed synchronously");
            promise.reject(reason);
        }
        promise
    }

    /// Dynamic construction path: a missing executor is an error.
    pub fn try_new_in(
        scheduler: Arc<dyn Scheduler>,
        executor: Option<Executor<T, E>>,
    ) -> Result<Self, Error> {
        let executor = executor.ok_or(Error::NotCallable)?;
        Ok(Self::new_in(scheduler, executor))
    }

    pub fn resolved_in(scheduler: Arc<dyn Scheduler>, value: T) -> Self {
        Self::new_in(scheduler, |resolve, _| {
            resolve.resolve(value);
            Ok(())
        })
    }

    pub fn rejected_in(scheduler: Arc<dyn Scheduler>, reason: E) -> Self {
        Self::new_in(scheduler, |_, reject| {
            reject.reject(reason);
            Ok(())
        })
    }

    /// The settled value or reason, `None` while pending.
    pub fn result(&self) -> Option<Result<T, E>> {
        self.inner.lock().settlement.outcome()
    }

    /// Derives a new promise from this one.
    ///
    /// When this promise settles, the matching callback runs as its own
    /// scheduled job. A missing callback forwards the outcome unchanged.
    /// A callback's `Ok` resolves the derived promise (adopting thenables),
    /// its `Err` rejects it.
    pub fn then(
        &self,
        on_fulfilled: Option<OnFulfilled<T, E>>,
        on_rejected: Option<OnRejected<T, E>>,
    ) -> Promise<T, E> {
        Promise::new_in(self.scheduler.clone(), |resolve, reject| {
            let mut inner = self.inner.lock();
            inner.reactions.push_back(Reaction {
                on_fulfilled,
                on_rejected,
                resolve,
                reject,
            });
            self.flush(&mut inner);
            Ok(())
        })
    }

    pub fn and_then<F>(&self, on_fulfilled: F) -> Promise<T, E>
    where
        F: FnOnce(T) -> Outcome<T, E> + Send + 'static,
    {
        self.then(Some(Box::new(on_fulfilled)), None)
    }

    pub fn catch<R>(&self, on_rejected: R) -> Promise<T, E>
    where
        R: FnOnce(E) -> Outcome<T, E> + Send + 'static,
    {
        self.then(None, Some(Box::new(on_rejected)))
    }

    /// A future resolving to the outcome once this promise settles.
    pub fn settled(&self) -> Waiter<T, E> {
        Waiter::new(self.clone())
    }

    pub(crate) fn poll_settled(&self, cx: &mut Context<'_>) -> Poll<Result<T, E>> {
        let mut inner = self.inner.lock();
        match inner.settlement.outcome() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    inner.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }

    fn resolver(&self) -> Resolve<T, E> {
        Resolve {
            promise: self.clone(),
        }
    }

    fn rejecter(&self) -> Reject<T, E> {
        Reject {
            promise: self.clone(),
        }
    }

    fn resolve(&self, resolution: Resolution<T, E>) {
        if !self.is_pending() {
            return;
        }
        match resolution {
            Resolution::Value(value) => self.settle(Settlement::Fulfilled(value)),
            Resolution::Adopt(thenable) => {
                debug!("adopting the outcome of a thenable");
                thenable.then(self.resolver(), self.rejecter());
            }
        }
    }

    fn reject(&self, reason: E) {
        self.settle(Settlement::Rejected(reason));
    }

    fn settle(&self, settlement: Settlement<T, E>) {
        let wakers = {
            let mut inner = self.inner.lock();
            if !inner.settlement.is_pending() {
                return;
            }
            trace!("promise {}", settlement.state());
            inner.settlement = settlement;
            self.flush(&mut inner);
            std::mem::take(&mut inner.wakers)
        };
        for waker in wakers {
            waker.wake();
        }
    }

    /// Hands every queued reaction to the scheduler, one job each.
    ///
    /// Runs under the promise lock so registration order is scheduling order.
    /// The outcome is cloned under that lock, and a job the scheduler refuses
    /// is dropped there too.
    fn flush(&self, inner: &mut Inner<T, E>) {
        let Some(outcome) = inner.settlement.outcome() else {
            return;
        };
        while let Some(reaction) = inner.reactions.pop_front() {
            let outcome = outcome.clone();
            trace!("scheduling reaction");
            if let Err(err) = self.scheduler.schedule(Box::new(move || reaction.run(outcome))) {
                error!("dropping promise reaction: {err}");
            }
        }
    }
}

impl<T, E> Thenable<T, E> for Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn then(self: Box<Self>, resolve: Resolve<T, E>, reject: Reject<T, E>) {
        // Queueing the forward would make the promise own itself.
        if self.ptr_eq(&resolve.promise) {
            warn!("promise resolved with itself, it will stay pending");
            return;
        }
        let mut inner = self.inner.lock();
        inner.reactions.push_back(Reaction::forward(resolve, reject));
        self.flush(&mut inner);
    }
}

impl<T, E> IntoFuture for Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = Result<T, E>;
    type IntoFuture = Waiter<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        Waiter::new(self)
    }
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<T, E> Resolve<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Fulfills the promise with `value`. No-op once settled.
    pub fn resolve(&self, value: T) {
        self.promise.resolve(Resolution::Value(value));
    }

    /// Makes the promise mirror `thenable`'s eventual outcome.
    pub fn adopt<H>(&self, thenable: H)
    where
        H: Thenable<T, E> + 'static,
    {
        self.promise.resolve(Resolution::adopt(thenable));
    }

    pub fn resolve_with(&self, resolution: Resolution<T, E>) {
        self.promise.resolve(resolution);
    }
}

impl<T, E> Reject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Rejects the promise with `reason`, stored verbatim. No-op once settled.
    pub fn reject(&self, reason: E) {
        self.promise.reject(reason);
    }
}

impl<T, E> Clone for Resolve<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T, E> Clone for Reject<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Resolve<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resolve").field(&self.promise).finish()
    }
}

impl<T, E> fmt::Debug for Reject<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reject").field(&self.promise).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::Promise;
    use crate::{Error, Job, MicrotaskQueue, Resolution, Scheduler, State};

    struct Closed;

    impl Scheduler for Closed {
        fn schedule(&self, _job: Job) -> Result<(), Error> {
            Err(Error::SchedulerClosed)
        }
    }

    #[test]
    fn test_then_never_runs_inline() {
        let queue = Arc::new(MicrotaskQueue::new());
        let called = Arc::new(Mutex::new(false));
        let p: Promise<i32, String> = Promise::resolved_in(queue.clone(), 1);

        let flag = called.clone();
        let derived = p.and_then(move |v| {
            *flag.lock().unwrap() = true;
            Ok(v.into())
        });
        assert!(!*called.lock().unwrap());
        assert_eq!(derived.state(), State::Pending);
        assert_eq!(queue.len(), 1);

        queue.run_until_idle();
        assert!(*called.lock().unwrap());
        assert_eq!(derived.result(), Some(Ok(1)));
    }

    #[test]
    fn test_flush_schedules_one_job_per_reaction() {
        let queue = Arc::new(MicrotaskQueue::new());
        let p: Promise<i32, String> = Promise::new_in(queue.clone(), |_, _| Ok(()));
        let resolve = p.resolver();
        p.and_then(|v| Ok(v.into()));
        p.and_then(|v| Ok(v.into()));
        p.catch(|e| Err(e));
        assert!(queue.is_empty());

        resolve.resolve(3);
        assert_eq!(queue.len(), 3);
        assert!(p.inner.lock().reactions.is_empty());
    }

    #[test]
    fn test_resolve_with_value() {
        let queue = Arc::new(MicrotaskQueue::new());
        let p: Promise<i32, String> = Promise::new_in(queue, |resolve, _| {
            resolve.resolve_with(Resolution::Value(9));
            Ok(())
        });
        assert_eq!(p.result(), Some(Ok(9)));
    }

    #[test]
    fn test_clones_share_state() {
        let queue = Arc::new(MicrotaskQueue::new());
        let p: Promise<i32, String> = Promise::rejected_in(queue, "r".into());
        let q = p.clone();
        assert!(p.ptr_eq(&q));
        assert_eq!(q.state(), State::Rejected);
        assert_eq!(format!("{q:?}"), "Promise { state: Rejected, .. }");
    }

    #[test]
    fn test_refused_reaction_is_dropped() {
        let p: Promise<i32, String> = Promise::resolved_in(Arc::new(Closed), 1);
        let derived = p.and_then(|v| Ok(v.into()));
        assert!(p.inner.lock().reactions.is_empty());
        assert_eq!(derived.state(), State::Pending);
        assert_eq!(Arc::strong_count(&derived.inner), 1);
    }

    #[test]
    fn test_self_adoption_is_not_retained() {
        let queue = Arc::new(MicrotaskQueue::new());
        let p: Promise<i32, String> = Promise::new_in(queue.clone(), |_, _| Ok(()));
        let resolve = p.resolver();
        resolve.adopt(p.clone());
        drop(resolve);
        queue.run_until_idle();
        assert_eq!(p.state(), State::Pending);
        assert!(p.inner.lock().reactions.is_empty());

        let weak = Arc::downgrade(&p.inner);
        drop(p);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_pending_chain_frees_every_link() {
        let queue = Arc::new(MicrotaskQueue::new());
        let root: Promise<i32, String> = Promise::new_in(queue, |_, _| Ok(()));
        let mut tail = root.clone();
        for _ in 0..3 {
            tail = tail.and_then(|v| Ok(v.into()));
        }
        let weak = Arc::downgrade(&tail.inner);
        drop(tail);
        assert!(weak.upgrade().is_some());
        drop(root);
        assert!(weak.upgrade().is_none());
    }
}
