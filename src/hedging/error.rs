use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HedgeError<E> {
    #[error("hedging dispatcher is stopped")]
    Stopped,
    #[error("all attempts failed: {0}")]
    AllAttemptsFailed(Failures<E>),
    #[error("attempt failed: {0}")]
    Failed(E),
}

impl<E> HedgeError<E> {
    /// The most recent error produced by the operation itself, if any.
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Failed(err) => Some(err),
            Self::AllAttemptsFailed(failures) => failures
                .into_iter()
                .rev()
                .find_map(|failure| match failure.error {
                    AttemptError::Failed(err) => Some(err),
                    AttemptError::Panicked(_) => None,
                }),
            Self::Stopped => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AttemptError<E> {
    #[error("{0}")]
    Failed(E),
    #[error("panicked: {0}")]
    Panicked(String),
}

#[derive(Debug)]
pub struct AttemptFailure<E> {
    pub ordinal: usize,
    pub error: AttemptError<E>,
}

/// Attempt failures of one race in completion order.
#[derive(Debug)]
pub struct Failures<E>(Vec<AttemptFailure<E>>);

impl<E> Failures<E> {
    pub(super) fn new() -> Self {
        Self(vec![])
    }

    pub(super) fn push(&mut self, ordinal: usize, error: AttemptError<E>) {
        self.0.push(AttemptFailure { ordinal, error });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&AttemptFailure<E>> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&AttemptFailure<E>> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttemptFailure<E>> {
        self.0.iter()
    }

    pub fn ordinals(&self) -> Vec<usize> {
        self.0.iter().map(|failure| failure.ordinal).collect()
    }
}

impl<E> IntoIterator for Failures<E> {
    type Item = AttemptFailure<E>;
    type IntoIter = std::vec::IntoIter<AttemptFailure<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<E: fmt::Display> fmt::Display for Failures<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last() {
            Some(last) => write!(
                f,
                "{} failure(s), last from attempt #{}: {}",
                self.len(),
                last.ordinal,
                last.error
            ),
            None => write!(f, "no attempts were started"),
        }
    }
}
