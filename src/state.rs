use std::fmt;

/// The observable state of a [`Promise`](crate::Promise).
///
/// A promise leaves `Pending` at most once and never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Pending,
    Fulfilled,
    Rejected,
}

impl State {
    pub fn is_pending(self) -> bool {
        self == State::Pending
    }

    pub fn is_settled(self) -> bool {
        !self.is_pending()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Pending => "pending",
            State::Fulfilled => "fulfilled",
            State::Rejected => "rejected",
        })
    }
}

/// State plus the settled value or reason.
#[derive(Debug, Clone)]
pub(crate) enum Settlement<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Default for Settlement<T, E> {
    fn default() -> Self {
        Settlement::Pending
    }
}

impl<T, E> Settlement<T, E> {
    pub(crate) fn state(&self) -> State {
        match self {
            Settlement::Pending => State::Pending,
            Settlement::Fulfilled(_) => State::Fulfilled,
            Settlement::Rejected(_) => State::Rejected,
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(self, Settlement::Pending)
    }

    /// `None` while pending.
    pub(crate) fn outcome(&self) -> Option<Result<T, E>>
    where
        T: Clone,
        E: Clone,
    {
        match self {
            Settlement::Pending => None,
            Settlement::Fulfilled(value) => Some(Ok(value.clone())),
            Settlement::Rejected(reason) => Some(Err(reason.clone())),
        }
    }
}
