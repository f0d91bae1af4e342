//! Single-flight computation coalescing.
//!
//! Concurrent cache misses for the same key collapse into one computation.
//! The first caller becomes the leader and spawns the work as a detached
//! task; later callers subscribe to the same flight. Every subscriber
//! receives the result when it lands.
//!
//! Cancellation is interest-counted: a waiter that drops out decrements
//! the flight's interest, and only when the last interested caller is gone
//! is the flight's [`CancellationToken`] cancelled, letting the work kill
//! any external processes it started.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Result type carried by a flight. Errors are strings so results stay
/// cloneable across subscribers.
pub type FlightResult<T> = Result<T, String>;

struct Flight<T> {
    tx: broadcast::Sender<FlightResult<T>>,
    token: CancellationToken,
    interest: Arc<AtomicUsize>,
}

/// Coalesces concurrent computations per key.
pub struct SingleFlight<T> {
    flights: Arc<Mutex<HashMap<String, Flight<T>>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SingleFlight<T> {
    /// Create an empty single-flight table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of in-flight computations (for health reporting).
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.flights
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl<T: Clone + Send + 'static> SingleFlight<T> {
    /// Run `work` for `key`, coalescing with any in-flight computation.
    ///
    /// The leader spawns `work(token)` as a detached task, so a cancelled
    /// leader does not abort the computation while other waiters remain.
    /// `token` is cancelled once every subscriber has lost interest.
    ///
    /// # Errors
    ///
    /// Returns the computation's error, or a flight-abandoned error if the
    /// producing task panicked.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> FlightResult<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = FlightResult<T>> + Send + 'static,
    {
        let (mut rx, interest) = {
            let mut flights = self
                .flights
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);

            if let Some(flight) = flights.get(key) {
                flight.interest.fetch_add(1, Ordering::SeqCst);
                (flight.tx.subscribe(), Arc::clone(&flight.interest))
            } else {
                let (tx, rx) = broadcast::channel(1);
                let token = CancellationToken::new();
                let interest = Arc::new(AtomicUsize::new(1));
                flights.insert(
                    key.to_owned(),
                    Flight {
                        tx: tx.clone(),
                        token: token.clone(),
                        interest: Arc::clone(&interest),
                    },
                );

                let flights_handle = Arc::clone(&self.flights);
                let owned_key = key.to_owned();
                let fut = work(token.clone());
                tokio::spawn(async move {
                    let result = fut.await;
                    flights_handle
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .remove(&owned_key);
                    // No receivers left is fine; the result is simply dropped
                    let _ = tx.send(result);
                });

                (rx, interest)
            }
        };

        let guard = InterestGuard {
            interest,
            token: {
                let flights = self
                    .flights
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                flights.get(key).map(|f| f.token.clone())
            },
        };

        let result = match rx.recv().await {
            Ok(result) => result,
            Err(_) => Err("computation abandoned".to_owned()),
        };
        drop(guard);
        result
    }
}

/// Decrements flight interest on drop; cancels the flight when interest
/// reaches zero.
struct InterestGuard {
    interest: Arc<AtomicUsize>,
    token: Option<CancellationToken>,
}

impl Drop for InterestGuard {
    fn drop(&mut self) {
        if self.interest.fetch_sub(1, Ordering::SeqCst) == 1
            && let Some(token) = &self.token
        {
            token.cancel();
        }
    }
}
