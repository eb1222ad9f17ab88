use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::aggregator::{self, AlertSummary};
use super::notifier::{Notifier, Subscription};
use crate::models::{AlertDescriptor, AlertKey, AlertOutcome, AlertType, Priority};

/// Active alerts, at most one per `(entity_id, alert_type)`.
///
/// Every mutation runs under one lock and is a single replace-or-insert on a
/// keyed map. Observers are notified after the lock is released, and only
/// when the contents actually changed.
#[derive(Default)]
pub struct AlertStore {
    alerts: Mutex<BTreeMap<AlertKey, AlertDescriptor>>,
    notifier: Notifier,
}

/// Insert `alert` unless an alert with the same content is already active.
/// Returns whether the map changed.
fn put(alerts: &mut BTreeMap<AlertKey, AlertDescriptor>, alert: AlertDescriptor) -> bool {
    let key = alert.key();
    match alerts.get(&key) {
        Some(existing) if existing.same_content(&alert) => false,
        _ => {
            alerts.insert(key, alert);
            true
        }
    }
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<AlertKey, AlertDescriptor>> {
        self.alerts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `mutate` under the lock; if it reports a change, notify observers
    /// with the state it left behind.
    fn mutate<T>(
        &self,
        mutate: impl FnOnce(&mut BTreeMap<AlertKey, AlertDescriptor>) -> (bool, T),
    ) -> T {
        let (result, snapshot) = {
            let mut alerts = self.lock();
            let (changed, result) = mutate(&mut alerts);
            debug_assert!(
                alerts.iter().all(|(key, alert)| *key == alert.key()),
                "alert stored under a foreign key"
            );
            let snapshot = changed.then(|| alerts.values().cloned().collect::<Vec<_>>());
            (result, snapshot)
        };

        if let Some(snapshot) = snapshot {
            debug!(active = snapshot.len(), "alert store changed");
            self.notifier.notify(&snapshot);
        }
        result
    }

    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&[AlertDescriptor]) + Send + Sync + 'static,
    {
        self.notifier.subscribe(observer)
    }

    /// Replace whatever alert is active for the same key. Re-raising an
    /// identical alert keeps the original (id, creation time, read flag).
    pub fn upsert(&self, alert: AlertDescriptor) -> bool {
        self.mutate(|alerts| {
            let changed = put(alerts, alert);
            (changed, changed)
        })
    }

    pub fn clear(&self, entity_id: &str, alert_type: AlertType) -> bool {
        let key = AlertKey::new(entity_id, alert_type);
        self.mutate(|alerts| {
            let removed = alerts.remove(&key).is_some();
            (removed, removed)
        })
    }

    /// Remove every alert of an entity. Returns how many were removed.
    pub fn clear_all_for_entity(&self, entity_id: &str) -> usize {
        self.mutate(|alerts| {
            let before = alerts.len();
            alerts.retain(|key, _| key.entity_id != entity_id);
            let removed = before - alerts.len();
            (removed > 0, removed)
        })
    }

    /// Apply a batch of evaluation outcomes for one entity with a single
    /// notification.
    pub fn reconcile(&self, entity_id: &str, outcomes: Vec<AlertOutcome>) -> bool {
        self.mutate(|alerts| {
            let mut changed = false;
            for outcome in outcomes {
                match outcome.alert {
                    Some(alert) => {
                        debug_assert_eq!(alert.entity_id, entity_id);
                        debug_assert_eq!(alert.alert_type, outcome.alert_type);
                        changed |= put(alerts, alert);
                    }
                    None => {
                        let key = AlertKey::new(entity_id, outcome.alert_type);
                        changed |= alerts.remove(&key).is_some();
                    }
                }
            }
            (changed, changed)
        })
    }

    pub fn mark_read(&self, entity_id: &str, alert_type: AlertType) -> bool {
        let key = AlertKey::new(entity_id, alert_type);
        self.mutate(|alerts| match alerts.get_mut(&key) {
            Some(alert) if !alert.is_read => {
                alert.is_read = true;
                (true, true)
            }
            _ => (false, false),
        })
    }

    /// Bulk load, e.g. alerts persisted by a previous run.
    pub fn restore(&self, restored: Vec<AlertDescriptor>) -> usize {
        self.mutate(|alerts| {
            let mut loaded = 0;
            for alert in restored {
                if put(alerts, alert) {
                    loaded += 1;
                }
            }
            (loaded > 0, loaded)
        })
    }

    pub fn get(&self, entity_id: &str, alert_type: AlertType) -> Option<AlertDescriptor> {
        self.lock()
            .get(&AlertKey::new(entity_id, alert_type))
            .cloned()
    }

    pub fn get_by_entity(&self, entity_id: &str) -> Vec<AlertDescriptor> {
        self.lock()
            .values()
            .filter(|a| a.entity_id == entity_id)
            .cloned()
            .collect()
    }

    pub fn get_all(&self) -> Vec<AlertDescriptor> {
        self.lock().values().cloned().collect()
    }

    /// Alerts on the same rank of the unified scale, so `High` also returns
    /// `Warning` alerts and `Low` also returns `Info`.
    pub fn get_by_priority(&self, priority: Priority) -> Vec<AlertDescriptor> {
        self.lock()
            .values()
            .filter(|a| a.priority.rank() == priority.rank())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn summarize(&self) -> AlertSummary {
        aggregator::summarize(&self.get_all())
    }

    pub fn sorted_by_priority(&self) -> Vec<AlertDescriptor> {
        aggregator::sorted_by_priority(self.get_all())
    }

    pub fn top_n(&self, n: usize) -> Vec<AlertDescriptor> {
        aggregator::top_n(self.get_all(), n)
    }
}
