use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, error};

use crate::models::AlertDescriptor;

pub type Observer = Arc<dyn Fn(&[AlertDescriptor]) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    observers: Vec<(u64, Observer)>,
}

/// Delivers the alert collection to every observer, in subscription order.
#[derive(Default)]
pub struct Notifier {
    registry: Arc<Mutex<Registry>>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&[AlertDescriptor]) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.observers.push((id, Arc::new(observer)));
        debug!(subscription = id, "alert observer subscribed");

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.registry).observers.len()
    }

    /// Call every observer with `alerts`. A panicking observer is logged and
    /// skipped; the rest are still called.
    pub fn notify(&self, alerts: &[AlertDescriptor]) {
        // Snapshot the list so observers may (un)subscribe while being called.
        let observers: Vec<(u64, Observer)> = lock(&self.registry).observers.clone();

        for (id, observer) in observers {
            let result = catch_unwind(AssertUnwindSafe(|| observer(alerts)));
            if result.is_err() {
                error!(subscription = id, "alert observer panicked, continuing");
            }
        }
    }
}

/// Handle returned by [`Notifier::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes the observer"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Idempotent, and a no-op once the notifier is gone.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = lock(&registry);
            let before = registry.observers.len();
            registry.observers.retain(|(id, _)| *id != self.id);
            if registry.observers.len() != before {
                debug!(subscription = self.id, "alert observer unsubscribed");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
