// Alert core.
//
// - store.rs: keyed collection holding at most one alert per (entity, type)
// - notifier.rs: synchronous fan-out of the alert collection to observers
// - aggregator.rs: priority summaries and ordering for display
// - engine.rs: feeds snapshots through the evaluators into the store

pub mod aggregator;
pub mod engine;
pub mod notifier;
pub mod store;

pub use aggregator::AlertSummary;
pub use engine::AlertEngine;
pub use notifier::{Notifier, Subscription};
pub use store::AlertStore;
