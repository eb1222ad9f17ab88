use anyhow::Result;
use chrono::NaiveDateTime;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};
use tracing::warn;
use uuid::Uuid;

use crate::models::alert_record::ActiveAlertRecord;
use crate::models::AlertDescriptor;

pub mod queries;

pub type DbPool = Pool<Postgres>;

pub async fn init_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Number of stock movements for an item since `since`.
pub async fn count_recent_movements(
    pool: &DbPool,
    item_id: &str,
    since: NaiveDateTime,
) -> Result<u64> {
    let row = sqlx::query(queries::COUNT_RECENT_MOVEMENTS)
        .bind(item_id)
        .bind(since)
        .fetch_one(pool)
        .await?;
    let count: i64 = row.try_get("movements")?;
    Ok(count.max(0) as u64)
}

/// Replace the persisted alert set with `alerts` in one transaction.
/// Every row written by one call shares a snapshot id.
pub async fn replace_active_alerts(pool: &DbPool, alerts: &[AlertDescriptor]) -> Result<Uuid> {
    let snapshot_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(queries::DELETE_ACTIVE_ALERTS)
        .execute(&mut *tx)
        .await?;

    for alert in alerts {
        sqlx::query(queries::INSERT_ACTIVE_ALERT)
            .bind(&alert.id)
            .bind(&alert.entity_id)
            .bind(alert.entity_kind.as_str())
            .bind(alert.alert_type.as_str())
            .bind(alert.priority.as_str())
            .bind(&alert.title)
            .bind(&alert.message)
            .bind(alert.created_at)
            .bind(alert.is_read)
            .bind(Json(&alert.threshold_context))
            .bind(snapshot_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(snapshot_id)
}

/// Load persisted alerts. Rows that no longer map onto a known alert type or
/// priority are skipped.
pub async fn load_active_alerts(pool: &DbPool) -> Result<Vec<AlertDescriptor>> {
    let rows: Vec<ActiveAlertRecord> = sqlx::query_as(queries::SELECT_ACTIVE_ALERTS)
        .fetch_all(pool)
        .await?;

    let alerts = rows
        .into_iter()
        .filter_map(|row| {
            let alert_id = row.alert_id.clone();
            match AlertDescriptor::try_from(row) {
                Ok(alert) => Some(alert),
                Err(e) => {
                    warn!("Skipping persisted alert {}: {}", alert_id, e);
                    None
                }
            }
        })
        .collect();
    Ok(alerts)
}
