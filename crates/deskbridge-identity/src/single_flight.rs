//! Keyed single-flight execution of async producers.
//!
//! At most one producer runs per key at any time; concurrent callers for the
//! same key share its output. Slots are removed as soon as the execution
//! settles, so this is a de-duplication window and not a cache.
//!
//! The table only holds weak handles. When every caller of a flight has
//! dropped its future, the producer is dropped with it and the slot is
//! cleared. While at least one caller is still waiting the producer keeps
//! running to completion.

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use tracing::trace;

type Flight<T> = Shared<BoxFuture<'static, T>>;

struct Slot<T> {
    generation: u64,
    flight: WeakShared<BoxFuture<'static, T>>,
}

struct FlightTable<T> {
    next_generation: u64,
    slots: HashMap<String, Slot<T>>,
}

/// Keyed mutual exclusion over in-flight futures.
///
/// Cloning is cheap and clones share the same table. Keys are opaque; callers
/// namespace them (for example `org:<id>`).
pub struct SingleFlight<T> {
    table: Arc<Mutex<FlightTable<T>>>,
}

impl<T> Clone for SingleFlight<T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.table.lock().slots.len())
            .finish()
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(FlightTable {
                next_generation: 0,
                slots: HashMap::new(),
            })),
        }
    }

    /// Join the execution in flight for `key`, or start one with `producer`.
    ///
    /// Admission happens when `run` is called. The producer itself is invoked
    /// lazily on first poll, outside the table lock, so it may call `run` for
    /// other keys.
    pub fn run<F, Fut>(&self, key: &str, producer: F) -> impl Future<Output = T> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.admit(key, producer)
    }

    /// Number of keys with an execution in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.table.lock().slots.len()
    }

    /// Whether an execution is in flight for `key`.
    #[must_use]
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.table.lock().slots.contains_key(key)
    }

    fn admit<F, Fut>(&self, key: &str, producer: F) -> Flight<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut table = self.table.lock();

        if let Some(flight) = table.slots.get(key).and_then(|slot| slot.flight.upgrade()) {
            trace!(key, "Joining in-flight execution");
            return flight;
        }

        table.next_generation += 1;
        let generation = table.next_generation;
        let guard = SlotGuard {
            table: Arc::downgrade(&self.table),
            key: key.to_owned(),
            generation,
        };

        let flight = async move {
            let _guard = guard;
            producer().await
        }
        .boxed()
        .shared();

        // A fresh flight has not completed, so downgrade always succeeds.
        if let Some(weak) = flight.downgrade() {
            table.slots.insert(
                key.to_owned(),
                Slot {
                    generation,
                    flight: weak,
                },
            );
        }
        trace!(key, generation, "Started new execution");

        flight
    }
}

/// Clears a slot when its producer settles or is dropped.
struct SlotGuard<T> {
    table: Weak<Mutex<FlightTable<T>>>,
    key: String,
    generation: u64,
}

impl<T> Drop for SlotGuard<T> {
    fn drop(&mut self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        let mut table = table.lock();
        let current = table
            .slots
            .get(&self.key)
            .is_some_and(|slot| slot.generation == self.generation);
        if current {
            table.slots.remove(&self.key);
        }
    }
}
