use chrono::NaiveDateTime;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;

use super::alert::{AlertDescriptor, UnknownVariant};

/// Row of the `active_alerts` table.
#[derive(Debug, FromRow)]
pub struct ActiveAlertRecord {
    pub alert_id: String,
    pub entity_id: String,
    pub entity_kind: String,
    pub alert_type: String,
    pub priority: String,
    pub title: String,
    pub message: String,
    pub created_at: NaiveDateTime,
    pub is_read: bool,
    pub threshold_context: Option<Json<BTreeMap<String, Value>>>,
}

impl TryFrom<ActiveAlertRecord> for AlertDescriptor {
    type Error = UnknownVariant;

    fn try_from(row: ActiveAlertRecord) -> Result<Self, Self::Error> {
        Ok(AlertDescriptor {
            id: row.alert_id,
            entity_id: row.entity_id,
            entity_kind: row.entity_kind.parse()?,
            alert_type: row.alert_type.parse()?,
            priority: row.priority.parse()?,
            title: row.title,
            message: row.message,
            created_at: row.created_at,
            is_read: row.is_read,
            threshold_context: row.threshold_context.map(|c| c.0).unwrap_or_default(),
        })
    }
}
