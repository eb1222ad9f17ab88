use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::alerts::AlertEngine;
use crate::db::{self, DbPool};
use crate::models::message::{EntityAction, EntityMessage};
use crate::models::{EntitySnapshot, InventorySnapshot};

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub async fn process_message(
    engine: &AlertEngine,
    pool: Option<&DbPool>,
    payload: &[u8],
) -> anyhow::Result<()> {
    process_message_at(engine, pool, payload, local_now()).await
}

/// Handle one message from the entity feed with an explicit clock.
///
/// Unparseable payloads are logged and dropped. Records that parse but cannot
/// be normalised are returned as errors; the store is left untouched.
pub async fn process_message_at(
    engine: &AlertEngine,
    pool: Option<&DbPool>,
    payload: &[u8],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    // 1. Parse JSON
    let message: EntityMessage = match serde_json::from_slice(payload) {
        Ok(m) => m,
        Err(e) => {
            warn!("Failed to parse message: {}", e);
            return Ok(());
        }
    };

    // 2. Deletions drop the entity and its alerts
    if message.action == EntityAction::Delete {
        let kind = message.entity_kind;
        let entity_id = message.entity_id()?.to_string();
        let changed = engine.remove(kind, &entity_id);
        info!(
            "Removed {} {} (alerts changed: {})",
            kind.as_str(),
            entity_id,
            changed
        );
        return Ok(());
    }

    // 3. Normalise the raw record
    let mut snapshot = message.into_snapshot()?;
    debug!("Processing snapshot {:?}", snapshot);

    // 4. Movement history for the inactive item rule
    if let (EntitySnapshot::InventoryItem(item), Some(pool)) = (&mut snapshot, pool) {
        fill_recent_movements(item, pool, engine, now).await;
    }

    // 5. Evaluate and apply
    let entity_id = snapshot.id().to_string();
    if engine.ingest(snapshot, now) {
        info!("Alerts updated for entity {}", entity_id);
    }

    Ok(())
}

async fn fill_recent_movements(
    item: &mut InventorySnapshot,
    pool: &DbPool,
    engine: &AlertEngine,
    now: NaiveDateTime,
) {
    if item.stock_on_hand <= 0.0 {
        return;
    }
    let window = engine.thresholds().inactive_window_days;
    let since = now - chrono::Duration::days(window);
    match db::count_recent_movements(pool, &item.id, since).await {
        Ok(count) => item.recent_movements = Some(count),
        Err(e) => warn!("Movement lookup failed for item {}: {}", item.id, e),
    }
}

/// Re-evaluate every known entity, refreshing movement counts first when a
/// database is available.
pub async fn refresh_all(engine: &AlertEngine, pool: Option<&DbPool>) -> usize {
    let now = local_now();

    if let Some(pool) = pool {
        let mut changed = 0;
        for cached in engine.cached_snapshots() {
            let mut snapshot = cached.clone();
            if let EntitySnapshot::InventoryItem(item) = &mut snapshot {
                fill_recent_movements(item, pool, engine, now).await;
            }
            if engine.reingest(&cached, snapshot, now) {
                changed += 1;
            }
        }
        changed
    } else {
        engine.refresh(now)
    }
}

pub async fn run_refresh_loop(engine: Arc<AlertEngine>, pool: Option<DbPool>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;
        let changed = refresh_all(&engine, pool.as_ref()).await;
        info!(
            "Periodic alert refresh done: {} entities changed, {} alerts active",
            changed,
            engine.store().len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertStore;
    use crate::config::AlertThresholds;
    use crate::models::{AlertType, Priority};
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap()
    }

    fn engine() -> AlertEngine {
        AlertEngine::new(AlertThresholds::default(), Arc::new(AlertStore::new()))
    }

    #[tokio::test]
    async fn test_vehicle_message_raises_alert() {
        let engine = engine();
        let payload = br#"{
            "uuid": "5f0c4c1e-1111-4a4a-9999-000000000001",
            "entity_kind": "vehicle",
            "entity_id": "V1",
            "data": {"make": "Toyota", "model": "Corolla", "license_plate": "ABC-123",
                     "current_odometer": "4950", "next_oil_change_odometer": "5000"}
        }"#;

        process_message_at(&engine, None, payload, now()).await.unwrap();

        let alerts = engine.store().get_by_entity("V1");
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].priority, Priority::Medium);
        assert_eq!(
            alerts[0].message,
            "Toyota Corolla (ABC-123) needs oil change in 50 km"
        );
    }

    #[tokio::test]
    async fn test_delete_message_clears_alerts() {
        let engine = engine();
        let upsert = br#"{"entity_kind": "inventory_item", "entity_id": "I1",
                          "data": {"name": "Coolant", "stock_on_hand": 0}}"#;
        process_message_at(&engine, None, upsert, now()).await.unwrap();
        assert!(engine.store().get("I1", AlertType::OutOfStock).is_some());

        let delete = br#"{"action": "delete", "entity_kind": "inventory_item", "entity_id": "I1"}"#;
        process_message_at(&engine, None, delete, now()).await.unwrap();
        assert!(engine.store().is_empty());
        assert!(engine.cached_snapshots().is_empty());
    }

    #[tokio::test]
    async fn test_garbage_payload_is_skipped() {
        let engine = engine();
        process_message_at(&engine, None, b"not json", now()).await.unwrap();
        assert!(engine.store().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_record_is_reported_and_isolated() {
        let engine = engine();
        let good = br#"{"entity_kind": "inventory_item", "entity_id": "I1",
                        "data": {"stock_on_hand": "0"}}"#;
        process_message_at(&engine, None, good, now()).await.unwrap();

        let bad = br#"{"entity_kind": "inventory_item", "entity_id": "I2",
                       "data": {"stock_on_hand": "twelve"}}"#;
        assert!(process_message_at(&engine, None, bad, now()).await.is_err());

        assert_eq!(engine.store().len(), 1);
        assert!(engine.store().get_by_entity("I2").is_empty());
    }

    #[tokio::test]
    async fn test_refresh_without_database() {
        let engine = engine();
        let payload = br#"{"entity_kind": "rental", "entity_id": "R1",
                           "data": {"status": "active", "end_date": "2000-01-01"}}"#;
        process_message(&engine, None, payload).await.unwrap();
        assert_eq!(engine.store().len(), 1);

        assert!(refresh_all(&engine, None).await <= 1);
        let alert = engine.store().get("R1", AlertType::RentalReturnOverdue).unwrap();
        assert_eq!(alert.priority, Priority::High);
        assert!(alert.message.contains("is overdue by"));
    }
}
