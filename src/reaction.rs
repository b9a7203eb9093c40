use crate::promise::{Reject, Resolve};
use crate::resolution::Resolution;

/// What a reaction callback produces. `Err` rejects the derived promise.
pub type Outcome<T, E> = Result<Resolution<T, E>, E>;

pub type OnFulfilled<T, E> = Box<dyn FnOnce(T) -> Outcome<T, E> + Send>;
pub type OnRejected<T, E> = Box<dyn FnOnce(E) -> Outcome<T, E> + Send>;

/// A pending `then` registration: the callbacks plus the entry points of the
/// promise `then` returned.
pub(crate) struct Reaction<T, E> {
    pub(crate) on_fulfilled: Option<OnFulfilled<T, E>>,
    pub(crate) on_rejected: Option<OnRejected<T, E>>,
    pub(crate) resolve: Resolve<T, E>,
    pub(crate) reject: Reject<T, E>,
}

impl<T, E> Reaction<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// A reaction with no callbacks, forwarding the outcome as-is.
    pub(crate) fn forward(resolve: Resolve<T, E>, reject: Reject<T, E>) -> Self {
        Reaction {
            on_fulfilled: None,
            on_rejected: None,
            resolve,
            reject,
        }
    }

    /// Runs inside a scheduled job, never inline with the settlement.
    pub(crate) fn run(self, outcome: Result<T, E>) {
        let outcome = match outcome {
            Ok(value) => match self.on_fulfilled {
                Some(callback) => callback(value),
                None => Ok(Resolution::Value(value)),
            },
            Err(reason) => match self.on_rejected {
                Some(callback) => callback(reason),
                None => Err(reason),
            },
        };
        match outcome {
            Ok(resolution) => self.resolve.resolve_with(resolution),
            Err(reason) => self.reject.reject(reason),
        }
    }
}
