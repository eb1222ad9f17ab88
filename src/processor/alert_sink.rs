use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::alerts::{aggregator, AlertStore, Subscription};
use crate::db::{self, DbPool};
use crate::models::{AlertDescriptor, Priority};

/// Forward every store change into a watch channel. Only the latest state is
/// kept, so a slow consumer skips intermediate states instead of queueing them.
pub fn watch_store(store: &AlertStore) -> (Subscription, watch::Receiver<Vec<AlertDescriptor>>) {
    let (tx, rx) = watch::channel(store.get_all());
    let subscription = store.subscribe(move |alerts| {
        tx.send_replace(alerts.to_vec());
    });
    (subscription, rx)
}

/// Persist each new alert state until the store side of the channel closes.
pub fn spawn_persistence(
    pool: DbPool,
    mut rx: watch::Receiver<Vec<AlertDescriptor>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let alerts = rx.borrow_and_update().clone();
            match db::replace_active_alerts(&pool, &alerts).await {
                Ok(snapshot_id) => info!(
                    "Persisted {} active alerts (snapshot {})",
                    alerts.len(),
                    snapshot_id
                ),
                Err(e) => error!("Failed to persist active alerts: {}", e),
            }
        }
        warn!("Alert store closed, persistence task exiting");
    })
}

/// Log the priority breakdown whenever the alert set changes.
pub fn log_summary(alerts: &[AlertDescriptor]) {
    let summary = aggregator::summarize(alerts);
    let urgent = aggregator::count_at_least(alerts, Priority::High);
    info!(
        total = summary.total,
        critical = summary.critical,
        high = summary.high,
        medium = summary.medium,
        low = summary.low,
        unread = summary.unread,
        "Active alerts changed"
    );
    if let Some(top) = aggregator::top_n(alerts.to_vec(), 1).first() {
        if urgent > 0 {
            warn!("{} urgent alerts, most severe: {}", urgent, top.message);
        }
    }
}
