use anyhow::Result;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub kafka_bootstrap_servers: String,
    pub kafka_topic: String,
    pub kafka_group_id: String,
    pub kafka_auto_offset_reset: String,
    pub kafka_sasl_mechanism: String,
    pub kafka_username: String,
    pub kafka_password: String,
    pub kafka_security_protocol: String,
    pub kafka_max_retries: u32,
    pub kafka_circuit_breaker_cooldown: u64,
    pub database_url: String,
    pub log_level: String,
    pub refresh_interval_secs: u64,
    pub thresholds: AlertThresholds,
}

/// Boundaries used by the threshold evaluators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Oil change alerts start this many km before the service odometer.
    pub oil_change_window_km: i64,
    /// At or below this distance the alert is raised to medium.
    pub oil_change_urgent_km: i64,
    pub expiry_window_days: i64,
    pub expiry_urgent_days: i64,
    pub rental_window_days: i64,
    /// Stock value (stock on hand * unit cost) above which an item is flagged.
    pub high_value_threshold: f64,
    pub inactive_window_days: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            oil_change_window_km: 100,
            oil_change_urgent_km: 50,
            expiry_window_days: 30,
            expiry_urgent_days: 7,
            rental_window_days: 1,
            high_value_threshold: 5000.0,
            inactive_window_days: 60,
        }
    }
}

impl AlertThresholds {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            oil_change_window_km: env_or("ALERT_OIL_CHANGE_WINDOW_KM", defaults.oil_change_window_km),
            oil_change_urgent_km: env_or("ALERT_OIL_CHANGE_URGENT_KM", defaults.oil_change_urgent_km),
            expiry_window_days: env_or("ALERT_EXPIRY_WINDOW_DAYS", defaults.expiry_window_days),
            expiry_urgent_days: env_or("ALERT_EXPIRY_URGENT_DAYS", defaults.expiry_urgent_days),
            rental_window_days: env_or("ALERT_RENTAL_WINDOW_DAYS", defaults.rental_window_days),
            high_value_threshold: env_or("ALERT_HIGH_VALUE_THRESHOLD", defaults.high_value_threshold),
            inactive_window_days: env_or("ALERT_INACTIVE_WINDOW_DAYS", defaults.inactive_window_days),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let kafka_bootstrap_servers =
            env::var("KAFKA_BOOTSTRAP_SERVERS").unwrap_or_else(|_| "localhost:9092".to_string());
        let kafka_topic =
            env::var("KAFKA_TOPIC").unwrap_or_else(|_| "fleet-entity-snapshots".to_string());
        let kafka_group_id =
            env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| "fleet-alerts-consumer".to_string());
        let kafka_auto_offset_reset =
            env::var("KAFKA_AUTO_OFFSET_RESET").unwrap_or_else(|_| "latest".to_string());
        let kafka_sasl_mechanism =
            env::var("KAFKA_SASL_MECHANISM").unwrap_or_else(|_| "SCRAM-SHA-256".to_string());
        let kafka_username = env::var("KAFKA_USERNAME").unwrap_or_default();
        let kafka_password = env::var("KAFKA_PASSWORD").unwrap_or_default();
        let kafka_security_protocol =
            env::var("KAFKA_SECURITY_PROTOCOL").unwrap_or_else(|_| "SASL_PLAINTEXT".to_string());
        let kafka_max_retries = env_or("KAFKA_MAX_RETRIES", 5);
        let kafka_circuit_breaker_cooldown = env_or("KAFKA_CIRCUIT_BREAKER_COOLDOWN", 300);

        let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let db_name = env::var("DB_DATABASE").unwrap_or_else(|_| "fleet_admin".to_string());
        let db_user = env::var("DB_USER").unwrap_or_else(|_| "fleet".to_string());
        let db_pwd = env::var("DB_PWD").unwrap_or_else(|_| "fleet".to_string());

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_pwd, db_host, db_port, db_name
        );

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let refresh_interval_secs = env_or("ALERT_REFRESH_INTERVAL_SECS", 300);

        Ok(Self {
            kafka_bootstrap_servers,
            kafka_topic,
            kafka_group_id,
            kafka_auto_offset_reset,
            kafka_sasl_mechanism,
            kafka_username,
            kafka_password,
            kafka_security_protocol,
            kafka_max_retries,
            kafka_circuit_breaker_cooldown,
            database_url,
            log_level,
            refresh_interval_secs,
            thresholds: AlertThresholds::from_env(),
        })
    }
}
