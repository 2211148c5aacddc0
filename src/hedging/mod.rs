//! Request hedging.
//!
//! A race starts the primary attempt right away and one hedge attempt per entry of its
//! [`Schedule`]. The first attempt to succeed wins, the remaining ones are cancelled and
//! unfired hedges are never started. The race fails only once every started attempt failed.
//!
//! ```no_run
//! use dynamo_hedging::hedging::{HedgingDispatcher, Schedule};
//! use std::time::Duration;
//!
//! # async fn run() {
//! let dispatcher = HedgingDispatcher::new();
//! let result = dispatcher
//!     .race(|| async { Ok::<_, String>("item") }, &Schedule::from_millis([50]))
//!     .await;
//! dispatcher.shutdown(Duration::from_secs(5)).await;
//! # }
//! ```

mod error;
mod handle;
mod race;
mod schedule;

pub use error::{AttemptError, AttemptFailure, Failures, HedgeError};
pub use handle::{Hedged, RaceHandle, RaceResult};
pub use schedule::Schedule;

use handle::Inner;
use race::Race;

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::task::AbortHandle;
use tokio::time::{timeout, Instant};
use tracing::{info, warn};

/// What happens to attempts that are still running once a race is over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cancellation {
    /// Abort the attempt task at its next await point. A request already on the wire may
    /// still be processed by the service.
    #[default]
    Abort,
    /// Let the attempt run to completion and discard its result.
    Detach,
}

#[derive(Debug, Default)]
struct Races {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<u64, AbortHandle>>,
}

impl Races {
    fn lock(&self) -> MutexGuard<'_, HashMap<u64, AbortHandle>> {
        // The map stays consistent even if a holder panicked.
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: u64) {
        self.lock().remove(&id);
    }

    fn abort_all(&self) -> usize {
        let tasks: Vec<AbortHandle> = self.lock().drain().map(|(_, task)| task).collect();
        for task in tasks.iter() {
            task.abort();
        }
        tasks.len()
    }
}

/// Removes a race from the live set when its task ends, however it ends.
struct Registration {
    id: u64,
    races: Arc<Races>,
    live: Arc<watch::Sender<usize>>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.races.remove(self.id);
        self.live.send_modify(|live| *live = live.saturating_sub(1));
    }
}

pub struct HedgingDispatcher {
    handle: Handle,
    cancellation: Cancellation,
    closed: watch::Sender<bool>,
    live: Arc<watch::Sender<usize>>,
    races: Arc<Races>,
}

impl HedgingDispatcher {
    /// Create a dispatcher on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    /// Create a dispatcher that spawns races and attempts on `handle`.
    pub fn with_handle(handle: Handle) -> Self {
        let (closed, _) = watch::channel(false);
        let (live, _) = watch::channel(0);

        Self {
            handle,
            cancellation: Cancellation::default(),
            closed,
            live: Arc::new(live),
            races: Arc::new(Races::default()),
        }
    }

    pub fn set_cancellation(self, cancellation: Cancellation) -> Self {
        Self {
            cancellation,
            ..self
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.closed.borrow()
    }

    /// Number of hedged races that have not finished yet.
    pub fn live_races(&self) -> usize {
        *self.live.borrow()
    }

    /// Race the attempts produced by `supplier` according to `schedule`.
    ///
    /// The race runs on its own task, which starts the primary attempt when it is first
    /// polled and the hedges as their delays elapse. With an empty schedule the single
    /// attempt runs inside the returned handle and its error is passed through as
    /// [`HedgeError::Failed`].
    pub fn race<T, E, F, Fut>(&self, supplier: F, schedule: &Schedule) -> RaceHandle<T, E>
    where
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if self.is_shutdown() {
            warn!("Rejecting request. Hedging dispatcher is shutdown.");
            return RaceHandle::new(Inner::Stopped);
        }

        if schedule.is_empty() {
            return RaceHandle::new(Inner::Direct {
                started: Instant::now(),
                attempt: Box::pin(supplier()),
            });
        }

        let (result_tx, result_rx) = oneshot::channel();
        let race = Race::new(
            supplier,
            schedule,
            self.handle.clone(),
            self.cancellation,
            self.closed.subscribe(),
        );

        let id = self.races.next_id.fetch_add(1, Ordering::Relaxed);
        self.live.send_modify(|live| *live += 1);
        let registration = Registration {
            id,
            races: Arc::clone(&self.races),
            live: Arc::clone(&self.live),
        };

        // A runtime that is shut down drops the task inside `spawn`, so the registry lock
        // must not be held here.
        let task = self.handle.spawn(async move {
            let _registration = registration;
            race.run(result_tx).await;
        });
        self.races.lock().insert(id, task.abort_handle());
        // The task may have deregistered before it was inserted.
        if task.is_finished() {
            self.races.remove(id);
        }

        RaceHandle::new(Inner::Hedged(result_rx))
    }

    /// Stop accepting races and drop every unfired hedge, then wait up to `timeout` for
    /// live races to finish. Races still running after that are aborted and resolve to
    /// [`HedgeError::Stopped`]. Calling this more than once is harmless.
    pub async fn shutdown(&self, timeout_after: Duration) {
        if self.closed.send_replace(true) {
            info!("Hedging dispatcher is already shutdown.");
        } else {
            info!("Shutting down hedging dispatcher.");
        }

        let mut live = self.live.subscribe();
        if timeout(timeout_after, live.wait_for(|live| *live == 0))
            .await
            .is_err()
        {
            let aborted = self.races.abort_all();
            warn!("Hedging dispatcher did not quiesce in {timeout_after:?}. Aborted {aborted} race(s).");
        }
    }
}

impl Default for HedgingDispatcher {
    fn default() -> HedgingDispatcher {
        HedgingDispatcher::new()
    }
}

impl fmt::Debug for HedgingDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HedgingDispatcher")
            .field("cancellation", &self.cancellation)
            .field("shutdown", &self.is_shutdown())
            .field("live_races", &self.live_races())
            .finish()
    }
}
