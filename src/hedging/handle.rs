use super::HedgeError;

use futures::future::BoxFuture;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// The successful outcome of a race.
#[derive(Debug, Clone, PartialEq)]
pub struct Hedged<T> {
    pub value: T,
    /// Ordinal of the winning attempt. 1 is the primary.
    pub attempt: usize,
    /// Time from the start of the race until the winner completed.
    pub elapsed: Duration,
}

impl<T> Hedged<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}

pub type RaceResult<T, E> = Result<Hedged<T>, HedgeError<E>>;

pub(super) enum Inner<T, E> {
    Stopped,
    Direct {
        started: Instant,
        attempt: BoxFuture<'static, Result<T, E>>,
    },
    Hedged(oneshot::Receiver<RaceResult<T, E>>),
    Done,
}

/// Handle to a running race. Resolves once with the race result; dropping it abandons the race.
#[must_use = "a race is abandoned when its handle is dropped"]
pub struct RaceHandle<T, E> {
    inner: Inner<T, E>,
}

impl<T, E> RaceHandle<T, E> {
    pub(super) fn new(inner: Inner<T, E>) -> Self {
        Self { inner }
    }
}

impl<T, E> Future for RaceHandle<T, E> {
    type Output = RaceResult<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let output = match &mut this.inner {
            Inner::Stopped => Err(HedgeError::Stopped),
            Inner::Direct { started, attempt } => match attempt.as_mut().poll(cx) {
                Poll::Ready(result) => result
                    .map(|value| Hedged {
                        value,
                        attempt: 1,
                        elapsed: started.elapsed(),
                    })
                    .map_err(HedgeError::Failed),
                Poll::Pending => return Poll::Pending,
            },
            Inner::Hedged(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(result)) => result,
                // The race was torn down before it could deliver.
                Poll::Ready(Err(_)) => Err(HedgeError::Stopped),
                Poll::Pending => return Poll::Pending,
            },
            Inner::Done => panic!("RaceHandle polled after completion"),
        };

        this.inner = Inner::Done;
        Poll::Ready(output)
    }
}
