use std::sync::Arc;
use std::time::Duration;

use fleet_alerts::alerts::{AlertEngine, AlertStore};
use fleet_alerts::config::AppConfig;
use fleet_alerts::db;
use fleet_alerts::kafka;
use fleet_alerts::processor::{alert_sink, snapshot_processor};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting Fleet Alerts Service...");

    // Init DB
    let pool = db::init_pool(&config.database_url).await?;
    info!("Connected to database");

    // Alert store, seeded with what the previous run left behind
    let store = Arc::new(AlertStore::new());
    match db::load_active_alerts(&pool).await {
        Ok(alerts) => info!("Restored {} persisted alerts", store.restore(alerts)),
        Err(e) => warn!("Could not restore persisted alerts: {}", e),
    }

    // Observers live as long as main does
    let _log_subscription = store.subscribe(alert_sink::log_summary);
    let (_persist_subscription, rx) = alert_sink::watch_store(&store);
    alert_sink::spawn_persistence(pool.clone(), rx);

    let engine = Arc::new(AlertEngine::new(config.thresholds.clone(), store));

    // Date based alerts age without new snapshots
    tokio::spawn(snapshot_processor::run_refresh_loop(
        engine.clone(),
        Some(pool.clone()),
        Duration::from_secs(config.refresh_interval_secs.max(1)),
    ));

    // Start Kafka
    kafka::start_kafka_consumer(&config, engine, Some(pool)).await?;

    Ok(())
}
