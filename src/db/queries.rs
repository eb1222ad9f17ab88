pub const COUNT_RECENT_MOVEMENTS: &str = r#"
SELECT COUNT(*) AS movements FROM inventory_movements WHERE item_id = $1 AND created_at >= $2;
"#;

pub const SELECT_ACTIVE_ALERTS: &str = r#"
SELECT alert_id, entity_id, entity_kind, alert_type, priority, title, message,
       created_at, is_read, threshold_context
FROM active_alerts
ORDER BY created_at;
"#;

pub const DELETE_ACTIVE_ALERTS: &str = r#"
DELETE FROM active_alerts;
"#;

pub const INSERT_ACTIVE_ALERT: &str = r#"
INSERT INTO active_alerts (
    alert_id, entity_id, entity_kind, alert_type, priority, title, message,
    created_at, is_read, threshold_context, snapshot_id
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11);
"#;
