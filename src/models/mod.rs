pub mod alert;
pub mod alert_record;
pub mod message;
pub mod snapshot;

pub use alert::{AlertDescriptor, AlertKey, AlertOutcome, AlertType, EntityKind, Priority};
pub use snapshot::{EntitySnapshot, InventorySnapshot, RentalSnapshot, RentalStatus, VehicleSnapshot};
