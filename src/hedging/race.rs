use super::{
    handle::{Hedged, RaceResult},
    AttemptError, Cancellation, Failures, HedgeError, Schedule,
};

use futures::FutureExt;
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{info, warn};

const UNDECIDED: usize = 0;

type Outcome<T, E> = (usize, Result<T, AttemptError<E>>);

/// One hedged race. Runs as a single task that owns every attempt and timer of the race.
pub(super) struct Race<T, E, F> {
    supplier: Arc<F>,
    handle: Handle,
    cancellation: Cancellation,
    closed: watch::Receiver<bool>,
    started: Instant,
    winner: Arc<AtomicUsize>,
    pending: VecDeque<(Instant, usize)>,
    attempts: Vec<(usize, JoinHandle<()>)>,
    in_flight: usize,
    failures: Failures<E>,
    tx: mpsc::UnboundedSender<Outcome<T, E>>,
    rx: mpsc::UnboundedReceiver<Outcome<T, E>>,
}

impl<T, E, F, Fut> Race<T, E, F>
where
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    pub(super) fn new(
        supplier: F,
        schedule: &Schedule,
        handle: Handle,
        cancellation: Cancellation,
        closed: watch::Receiver<bool>,
    ) -> Self {
        let started = Instant::now();
        let pending = schedule
            .hedges()
            .into_iter()
            .map(|(ordinal, delay)| (started + delay, ordinal))
            .collect();
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            supplier: Arc::new(supplier),
            handle,
            cancellation,
            closed,
            started,
            winner: Arc::new(AtomicUsize::new(UNDECIDED)),
            pending,
            attempts: vec![],
            in_flight: 0,
            failures: Failures::new(),
            tx,
            rx,
        }
    }

    pub(super) async fn run(mut self, mut result_tx: oneshot::Sender<RaceResult<T, E>>) {
        info!("Initiating initial request #1");
        self.launch(1);

        loop {
            let deadline = self.pending.front().map(|(at, _)| *at);

            tokio::select! {
                biased;

                Some((ordinal, outcome)) = self.rx.recv() => {
                    self.in_flight -= 1;
                    self.attempts.retain(|(o, _)| *o != ordinal);

                    match outcome {
                        Ok(value) => {
                            if self.decide(ordinal) {
                                let hedged = Hedged {
                                    value,
                                    attempt: ordinal,
                                    elapsed: self.started.elapsed(),
                                };
                                if result_tx.send(Ok(hedged)).is_err() {
                                    info!("Race handle was dropped before request #{ordinal} won");
                                }
                                return;
                            }
                        }
                        Err(error) => {
                            warn!("Request #{ordinal} failed: {error}");
                            self.failures.push(ordinal, error);
                        }
                    }
                }

                _ = sleep_until(deadline.unwrap_or(self.started)), if deadline.is_some() => {
                    if let Some((_, ordinal)) = self.pending.pop_front() {
                        if *self.closed.borrow() {
                            self.pending.clear();
                        } else {
                            info!("Initiating hedged request #{ordinal}");
                            self.launch(ordinal);
                        }
                    }
                }

                _ = stopped(&mut self.closed), if !self.pending.is_empty() => {
                    info!(
                        "Dispatcher is stopped. Dropping {} scheduled hedged request(s).",
                        self.pending.len()
                    );
                    self.pending.clear();
                }

                _ = result_tx.closed() => {
                    info!("Race handle was dropped. Abandoning race.");
                    return;
                }
            }

            if self.in_flight == 0 && self.pending.is_empty() {
                let failures = std::mem::replace(&mut self.failures, Failures::new());
                let _ = result_tx.send(Err(HedgeError::AllAttemptsFailed(failures)));
                return;
            }
        }
    }

    fn launch(&mut self, ordinal: usize) {
        let supplier = Arc::clone(&self.supplier);
        let winner = Arc::clone(&self.winner);
        let tx = self.tx.clone();

        let attempt = self.handle.spawn(async move {
            let outcome = AssertUnwindSafe(async move { supplier().await })
                .catch_unwind()
                .await
                .map_err(panic_message)
                .and_then(|result| result.map_err(AttemptError::Failed));

            if winner.load(Ordering::Acquire) != UNDECIDED {
                info!("Got late response for request #{ordinal}. Ignoring it.");
                return;
            }
            info!("Got response for request #{ordinal}");
            let _ = tx.send((ordinal, outcome));
        });

        self.attempts.push((ordinal, attempt));
        self.in_flight += 1;
    }

    /// Record the winner. Only the first caller succeeds.
    fn decide(&self, ordinal: usize) -> bool {
        self.winner
            .compare_exchange(UNDECIDED, ordinal, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl<T, E, F> Drop for Race<T, E, F> {
    fn drop(&mut self) {
        // Attempts that already reported were removed in `run`.
        for (ordinal, attempt) in self.attempts.drain(..) {
            if attempt.is_finished() {
                continue;
            }
            match self.cancellation {
                Cancellation::Abort => {
                    info!("Cancelling pending request #{ordinal}");
                    attempt.abort();
                }
                Cancellation::Detach => {
                    info!("Detaching pending request #{ordinal}");
                }
            }
        }
    }
}

async fn stopped(closed: &mut watch::Receiver<bool>) {
    // A dropped dispatcher counts as stopped.
    let _ = closed.wait_for(|closed| *closed).await;
}

fn panic_message<E>(payload: Box<dyn Any + Send>) -> AttemptError<E> {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into());
    AttemptError::Panicked(message)
}
