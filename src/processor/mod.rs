pub mod alert_sink;
pub mod snapshot_processor;
