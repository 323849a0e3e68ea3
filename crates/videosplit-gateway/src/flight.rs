//! Single-flight coordination
//!
//! The first caller to `join` while nothing is in flight becomes the leader
//! and installs a shared future; everyone who joins before it resolves gets
//! a clone of that future and observes the same outcome. The shared future
//! clears the slot itself before yielding its output, so no waiter can see
//! a resolved outcome while the slot still reports a flight in progress.
//!
//! The work is driven by whichever holder polls it. Dropping the leader's
//! handle does not cancel the flight: a follower (or the next joiner) keeps
//! polling the same future.
//!
//! Every resolved flight bumps an epoch. A caller that read the epoch before
//! starting its own work and finds it moved on when joining gets the latest
//! outcome back (`Flight::Settled`) instead of starting a redundant flight.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};

type SharedFlight<T> = Shared<BoxFuture<'static, T>>;

struct Slot<T> {
    epoch: u64,
    inflight: Option<SharedFlight<T>>,
    last: Option<T>,
}

fn lock<T>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle returned by `SingleFlight::join`.
pub enum Flight<T: Clone> {
    /// This caller started the flight.
    Leader(SharedFlight<T>),
    /// A flight was already running; this caller waits on it.
    Follower(SharedFlight<T>),
    /// A flight resolved after the caller's epoch was read.
    Settled(T),
}

impl<T: Clone> Flight<T> {
    pub fn role(&self) -> &'static str {
        match self {
            Flight::Leader(_) => "leader",
            Flight::Follower(_) => "follower",
            Flight::Settled(_) => "settled",
        }
    }

    /// Wait for the flight's outcome.
    pub async fn outcome(self) -> T {
        match self {
            Flight::Leader(flight) | Flight::Follower(flight) => flight.await,
            Flight::Settled(outcome) => outcome,
        }
    }
}

/// At most one in-flight execution of an operation, shared by all callers.
pub struct SingleFlight<T: Clone> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                epoch: 0,
                inflight: None,
                last: None,
            })),
        }
    }

    /// Number of flights resolved so far.
    pub fn epoch(&self) -> u64 {
        lock(&self.slot).epoch
    }

    pub fn is_in_flight(&self) -> bool {
        lock(&self.slot).inflight.is_some()
    }

    /// Join the current flight, or start one with `start`.
    ///
    /// `seen_epoch` is the value of `epoch()` the caller read before doing
    /// the work that made it want a flight. `start` is only called when this
    /// caller becomes the leader.
    pub fn join<F, Fut>(&self, seen_epoch: u64, start: F) -> Flight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut slot = lock(&self.slot);

        if let Some(flight) = &slot.inflight {
            return Flight::Follower(flight.clone());
        }

        if slot.epoch != seen_epoch {
            if let Some(last) = &slot.last {
                return Flight::Settled(last.clone());
            }
        }

        let handle = Arc::clone(&self.slot);
        let work = start();
        let flight = async move {
            let outcome = work.await;
            let mut slot = lock(&handle);
            slot.epoch += 1;
            slot.last = Some(outcome.clone());
            slot.inflight = None;
            outcome
        }
        .boxed()
        .shared();

        slot.inflight = Some(flight.clone());
        Flight::Leader(flight)
    }
}
