//! Per-key single-flight execution.
//!
//! At most one computation per key runs at a time. The first caller for a key
//! becomes the leader and starts the work; callers arriving while it runs
//! wait for the leader's result instead of starting their own.
//!
//! The work runs on a detached tokio task, so dropping the leader's future
//! (for example when its client disconnects) does not strand the waiters.
//! If the work task dies without producing a result, waiters start over and
//! one of them becomes the new leader.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

type FlightMap<K, V> = Arc<Mutex<HashMap<K, Arc<InFlightState<V>>>>>;

/// Registry of in-flight computations keyed by `K`.
pub struct SingleFlight<K, V> {
    in_flight: FlightMap<K, V>,
}

/// State for one in-flight computation.
struct InFlightState<V> {
    /// Notification for waiters
    notify: Notify,
    /// Result of the computation (set when complete)
    result: Mutex<Option<V>>,
}

impl<V: Clone> InFlightState<V> {
    fn new() -> Self {
        Self {
            notify: Notify::new(),
            result: Mutex::new(None),
        }
    }

    fn result(&self) -> Option<V> {
        lock(&self.result).clone()
    }
}

/// Clears the in-flight entry and wakes waiters when the work task ends,
/// whether it completed or unwound.
struct FlightGuard<K: Eq + Hash, V> {
    in_flight: FlightMap<K, V>,
    key: K,
    state: Arc<InFlightState<V>>,
}

impl<K: Eq + Hash, V> FlightGuard<K, V> {
    fn complete(self, value: V) {
        *lock(&self.state.result) = Some(value);
        // Drop does the cleanup
    }
}

impl<K: Eq + Hash, V> Drop for FlightGuard<K, V> {
    fn drop(&mut self) {
        {
            let mut in_flight = lock(&self.in_flight);
            if in_flight
                .get(&self.key)
                .is_some_and(|state| Arc::ptr_eq(state, &self.state))
            {
                in_flight.remove(&self.key);
            }
        }
        self.state.notify.notify_waiters();
    }
}

/// Lock a std mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key` unless a run for `key` is already in flight, and
    /// return its result.
    ///
    /// `work` is only called by the leader. It may be called again if a
    /// previous leader's task died before producing a value.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> V
    where
        F: Fn() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        loop {
            let (state, is_leader) = {
                let mut in_flight = lock(&self.in_flight);

                if let Some(state) = in_flight.get(&key) {
                    // Another task is computing this key
                    (state.clone(), false)
                } else {
                    let state = Arc::new(InFlightState::new());
                    in_flight.insert(key.clone(), state.clone());
                    (state, true)
                }
            };

            // Register before checking the result so a completion between the
            // check and the await is not missed
            let notified = state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if is_leader {
                let guard = FlightGuard {
                    in_flight: Arc::clone(&self.in_flight),
                    key: key.clone(),
                    state: Arc::clone(&state),
                };
                let fut = work();
                tokio::spawn(async move {
                    let value = fut.await;
                    guard.complete(value);
                });
            }

            if let Some(value) = state.result() {
                return value;
            }

            notified.await;

            if let Some(value) = state.result() {
                return value;
            }

            // Work task died without a result; start over
        }
    }

    /// Number of keys with a computation currently in flight.
    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }
}
