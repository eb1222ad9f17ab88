// Alert engine - runs snapshots through the evaluators and keeps the store
// in step with the latest known state of every entity.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use tracing::debug;

use super::store::AlertStore;
use crate::config::AlertThresholds;
use crate::evaluators::{self, EvaluationContext};
use crate::models::{AlertOutcome, AlertType, EntityKind, EntitySnapshot};

type SnapshotKey = (EntityKind, String);

pub struct AlertEngine {
    thresholds: Mutex<AlertThresholds>,
    store: Arc<AlertStore>,
    /// Last snapshot seen per entity, re-evaluated by `refresh`.
    snapshots: Mutex<HashMap<SnapshotKey, EntitySnapshot>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AlertEngine {
    pub fn new(thresholds: AlertThresholds, store: Arc<AlertStore>) -> Self {
        Self {
            thresholds: Mutex::new(thresholds),
            store,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<AlertStore> {
        &self.store
    }

    /// Swap thresholds; takes effect on the next ingest or refresh.
    pub fn update_thresholds(&self, thresholds: AlertThresholds) {
        *lock(&self.thresholds) = thresholds;
    }

    pub fn thresholds(&self) -> AlertThresholds {
        lock(&self.thresholds).clone()
    }

    fn outcomes(&self, snapshot: &EntitySnapshot, now: NaiveDateTime) -> Vec<AlertOutcome> {
        let thresholds = self.thresholds();
        let ctx = EvaluationContext::new(now, &thresholds);
        evaluators::evaluate(snapshot, &ctx)
    }

    /// Evaluate a fresh snapshot, remember it and apply the result to the
    /// store. Returns whether the active alerts changed.
    pub fn ingest(&self, snapshot: EntitySnapshot, now: NaiveDateTime) -> bool {
        let outcomes = self.outcomes(&snapshot, now);
        let entity_id = snapshot.id().to_string();
        let raised = outcomes.iter().filter(|o| o.alert.is_some()).count();

        // Hold the cache lock across the store update so two ingests for the
        // same entity cannot interleave.
        let mut snapshots = lock(&self.snapshots);
        let changed = self.store.reconcile(&entity_id, outcomes);
        snapshots.insert((snapshot.kind(), entity_id.clone()), snapshot);

        debug!(entity_id = %entity_id, raised, changed, "snapshot evaluated");
        changed
    }

    /// Apply `snapshot` in place of `expected`, an entry previously read from
    /// the cache. Skipped when the entity was removed or replaced since, so a
    /// slow re-evaluation never overwrites newer state.
    pub fn reingest(
        &self,
        expected: &EntitySnapshot,
        snapshot: EntitySnapshot,
        now: NaiveDateTime,
    ) -> bool {
        debug_assert_eq!(expected.kind(), snapshot.kind());
        debug_assert_eq!(expected.id(), snapshot.id());
        let outcomes = self.outcomes(&snapshot, now);
        let key = (snapshot.kind(), snapshot.id().to_string());

        let mut snapshots = lock(&self.snapshots);
        if snapshots.get(&key) != Some(expected) {
            debug!(entity_id = %key.1, "snapshot changed during refresh, skipped");
            return false;
        }
        let changed = self.store.reconcile(&key.1, outcomes);
        snapshots.insert(key, snapshot);
        changed
    }

    /// Forget an entity and drop the alerts its kind can carry.
    pub fn remove(&self, kind: EntityKind, entity_id: &str) -> bool {
        let mut snapshots = lock(&self.snapshots);
        snapshots.remove(&(kind, entity_id.to_string()));
        let outcomes = AlertType::for_kind(kind)
            .iter()
            .map(|t| AlertOutcome::clear(*t))
            .collect();
        self.store.reconcile(entity_id, outcomes)
    }

    pub fn cached_snapshots(&self) -> Vec<EntitySnapshot> {
        lock(&self.snapshots).values().cloned().collect()
    }

    /// Re-evaluate every remembered snapshot against `now`. Date based alerts
    /// move with the calendar even when no new snapshot arrives. Returns the
    /// number of entities whose alerts changed.
    pub fn refresh(&self, now: NaiveDateTime) -> usize {
        self.cached_snapshots()
            .into_iter()
            .filter(|snapshot| {
                let outcomes = self.outcomes(snapshot, now);
                let snapshots = lock(&self.snapshots);
                // Skip entities removed or replaced since the cache was read.
                let key = (snapshot.kind(), snapshot.id().to_string());
                if snapshots.get(&key) != Some(snapshot) {
                    return false;
                }
                self.store.reconcile(snapshot.id(), outcomes)
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::test_support::{days_from_today, now};
    use crate::models::{InventorySnapshot, Priority, RentalSnapshot, RentalStatus, VehicleSnapshot};
    use chrono::Duration;

    fn engine() -> AlertEngine {
        AlertEngine::new(AlertThresholds::default(), Arc::new(AlertStore::new()))
    }

    fn vehicle(id: &str, current: i64, next: i64) -> EntitySnapshot {
        EntitySnapshot::Vehicle(VehicleSnapshot {
            id: id.to_string(),
            label: "Toyota Corolla (ABC-123)".to_string(),
            current_odometer: Some(current),
            next_oil_change_odometer: Some(next),
            insurance_expiry: None,
            registration_expiry: None,
        })
    }

    #[test]
    fn test_vehicle_scenario() {
        let engine = engine();
        assert!(engine.ingest(vehicle("V1", 4950, 5000), now()));

        let alerts = engine.store().get_by_entity("V1");
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::OilChange);
        assert_eq!(alerts[0].priority, Priority::Medium);
        assert!(alerts[0].message.ends_with("needs oil change in 50 km"));

        assert_eq!(engine.store().clear_all_for_entity("V1"), 1);
        assert!(engine.store().get_by_entity("V1").is_empty());
    }

    #[test]
    fn test_reingest_clears_resolved_alert() {
        let engine = engine();
        engine.ingest(vehicle("V1", 990, 1000), now());
        assert_eq!(engine.store().len(), 1);

        // Oil changed, next service far away.
        assert!(engine.ingest(vehicle("V1", 1000, 6000), now()));
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_same_snapshot_twice_is_a_noop() {
        let engine = engine();
        assert!(engine.ingest(vehicle("V1", 990, 1000), now()));
        assert!(!engine.ingest(vehicle("V1", 990, 1000), now() + Duration::minutes(5)));
    }

    #[test]
    fn test_remove_only_touches_own_kind() {
        let engine = engine();
        engine.ingest(vehicle("1", 1000, 1000), now());
        engine.ingest(
            EntitySnapshot::Rental(RentalSnapshot {
                id: "1".to_string(),
                label: "Rental 1".to_string(),
                status: RentalStatus::Active,
                end_date: Some(days_from_today(-1)),
            }),
            now(),
        );
        assert_eq!(engine.store().get_by_entity("1").len(), 2);

        assert!(engine.remove(EntityKind::Vehicle, "1"));
        let left = engine.store().get_by_entity("1");
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].alert_type, AlertType::RentalReturnOverdue);
        assert_eq!(engine.cached_snapshots().len(), 1);
    }

    #[test]
    fn test_refresh_follows_the_calendar() {
        let engine = engine();
        engine.ingest(
            EntitySnapshot::Rental(RentalSnapshot {
                id: "R1".to_string(),
                label: "Rental R1".to_string(),
                status: RentalStatus::Active,
                end_date: Some(days_from_today(3)),
            }),
            now(),
        );
        assert!(engine.store().is_empty());

        assert_eq!(engine.refresh(now() + Duration::days(2)), 1);
        assert_eq!(
            engine.store().get("R1", AlertType::RentalReturnOverdue).unwrap().priority,
            Priority::Medium
        );

        assert_eq!(engine.refresh(now() + Duration::days(4)), 1);
        assert_eq!(
            engine.store().get("R1", AlertType::RentalReturnOverdue).unwrap().priority,
            Priority::High
        );
        assert_eq!(engine.refresh(now() + Duration::days(4)), 0);
    }

    fn stock_item(stock: f64, movements: Option<u64>) -> EntitySnapshot {
        EntitySnapshot::InventoryItem(InventorySnapshot {
            id: "I1".to_string(),
            name: "Coolant".to_string(),
            sku: None,
            stock_on_hand: stock,
            reorder_level: Some(5.0),
            max_stock_level: None,
            unit_cost: None,
            recent_movements: movements,
        })
    }

    fn active_types(engine: &AlertEngine, entity_id: &str) -> Vec<AlertType> {
        engine
            .store()
            .get_by_entity(entity_id)
            .into_iter()
            .map(|a| a.alert_type)
            .collect()
    }

    #[test]
    fn test_reingest_ignores_removed_entities() {
        let engine = engine();
        let cached = vehicle("V1", 2000, 5000);
        assert!(!engine.reingest(&cached, vehicle("V1", 1000, 1000), now()));
        assert!(engine.store().is_empty());

        engine.ingest(cached.clone(), now());
        assert!(engine.reingest(&cached, vehicle("V1", 1000, 1000), now()));
        assert_eq!(engine.store().len(), 1);

        engine.remove(EntityKind::Vehicle, "V1");
        assert!(!engine.reingest(&cached, vehicle("V1", 1000, 1000), now()));
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_reingest_never_overwrites_newer_snapshot() {
        let engine = engine();
        engine.ingest(stock_item(50.0, Some(3)), now());
        let stale = engine.cached_snapshots();
        assert_eq!(stale.len(), 1);

        // A newer snapshot lands while the refresh is looking up history.
        engine.ingest(stock_item(0.0, None), now());
        assert_eq!(active_types(&engine, "I1"), vec![AlertType::OutOfStock]);

        let mut refreshed = stale[0].clone();
        if let EntitySnapshot::InventoryItem(item) = &mut refreshed {
            item.recent_movements = Some(0);
        }
        assert!(!engine.reingest(&stale[0], refreshed, now()));

        assert_eq!(active_types(&engine, "I1"), vec![AlertType::OutOfStock]);
        assert_eq!(engine.cached_snapshots(), vec![stock_item(0.0, None)]);
    }

    #[test]
    fn test_inactive_alert_cleared_when_stock_runs_out() {
        let engine = engine();
        engine.ingest(stock_item(50.0, Some(0)), now());
        assert_eq!(active_types(&engine, "I1"), vec![AlertType::InactiveItem]);

        // No history lookup happens for an empty item.
        assert!(engine.ingest(stock_item(0.0, None), now()));
        assert_eq!(active_types(&engine, "I1"), vec![AlertType::OutOfStock]);
    }

    #[test]
    fn test_thresholds_update() {
        let engine = engine();
        engine.update_thresholds(AlertThresholds {
            oil_change_window_km: 1000,
            ..AlertThresholds::default()
        });
        assert!(engine.ingest(vehicle("V1", 500, 1000), now()));
        assert_eq!(
            engine.store().get("V1", AlertType::OilChange).unwrap().priority,
            Priority::Low
        );
    }

    #[test]
    fn test_one_entity_does_not_disturb_another() {
        let engine = engine();
        engine.ingest(vehicle("V1", 1000, 1000), now());
        engine.ingest(
            EntitySnapshot::InventoryItem(InventorySnapshot {
                id: "I1".to_string(),
                name: "Coolant".to_string(),
                sku: None,
                stock_on_hand: 0.0,
                reorder_level: Some(5.0),
                max_stock_level: None,
                unit_cost: None,
                recent_movements: None,
            }),
            now(),
        );
        let summary = engine.store().summarize();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.high, 1);
    }
}
