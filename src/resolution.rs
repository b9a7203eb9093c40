use std::fmt;

use crate::promise::{Reject, Resolve};

/// A promise-like value: anything that can report an eventual outcome to a
/// pair of callbacks.
///
/// Implementors must eventually call at most one of `resolve` or `reject`.
/// Calling `resolve` with another thenable is allowed and is adopted in turn.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use thenable::{MicrotaskQueue, Promise, Reject, Resolution, Resolve, Thenable};
///
/// struct Ready(i32);
///
/// impl Thenable<i32, String> for Ready {
///     fn then(self: Box<Self>, resolve: Resolve<i32, String>, _reject: Reject<i32, String>) {
///         resolve.resolve(self.0);
///     }
/// }
///
/// let queue = Arc::new(MicrotaskQueue::new());
/// let promise: Promise<i32, String> = Promise::new_in(queue.clone(), |resolve, _reject| {
///     resolve.adopt(Ready(5));
///     Ok(())
/// });
/// assert_eq!(promise.result(), Some(Ok(5)));
/// ```
pub trait Thenable<T, E> {
    fn then(self: Box<Self>, resolve: Resolve<T, E>, reject: Reject<T, E>);
}

/// What a promise is resolved with: a plain value, or a thenable whose
/// outcome the promise adopts.
pub enum Resolution<T, E> {
    Value(T),
    Adopt(Box<dyn Thenable<T, E>>),
}

impl<T, E> Resolution<T, E> {
    pub fn adopt<H>(thenable: H) -> Self
    where
        H: Thenable<T, E> + 'static,
    {
        Resolution::Adopt(Box::new(thenable))
    }
}

impl<T, E> From<T> for Resolution<T, E> {
    fn from(value: T) -> Self {
        Resolution::Value(value)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolution::Adopt(_) => f.write_str("Adopt(..)"),
        }
    }
}
