use chrono::NaiveDateTime;
use serde::Serialize;

use super::alert::EntityKind;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("message is missing an entity id")]
    MissingEntityId,
    #[error("invalid {kind} record {entity_id}: {source}")]
    InvalidRecord {
        kind: &'static str,
        entity_id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSnapshot {
    pub id: String,
    /// Display label, e.g. "Toyota Corolla (ABC-123)".
    pub label: String,
    pub current_odometer: Option<i64>,
    pub next_oil_change_odometer: Option<i64>,
    pub insurance_expiry: Option<NaiveDateTime>,
    pub registration_expiry: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    Active,
    Ongoing,
    Reserved,
    Completed,
    Cancelled,
    Unknown,
}

impl RentalStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "active" => Self::Active,
            "ongoing" | "in_progress" => Self::Ongoing,
            "reserved" | "pending" | "confirmed" => Self::Reserved,
            "completed" | "returned" => Self::Completed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    /// Only rentals with the vehicle out on the road can become overdue.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Active | Self::Ongoing)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RentalSnapshot {
    pub id: String,
    pub label: String,
    pub status: RentalStatus,
    pub end_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySnapshot {
    pub id: String,
    pub name: String,
    pub sku: Option<String>,
    pub stock_on_hand: f64,
    pub reorder_level: Option<f64>,
    pub max_stock_level: Option<f64>,
    pub unit_cost: Option<f64>,
    /// Stock movements inside the inactivity window, when the history lookup ran.
    pub recent_movements: Option<u64>,
}

impl InventorySnapshot {
    pub fn label(&self) -> String {
        match &self.sku {
            Some(sku) => format!("{} (SKU: {})", self.name, sku),
            None => self.name.clone(),
        }
    }

    pub fn cost_value(&self) -> f64 {
        self.stock_on_hand * self.unit_cost.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntitySnapshot {
    Vehicle(VehicleSnapshot),
    Rental(RentalSnapshot),
    InventoryItem(InventorySnapshot),
}

impl EntitySnapshot {
    pub fn id(&self) -> &str {
        match self {
            Self::Vehicle(v) => &v.id,
            Self::Rental(r) => &r.id,
            Self::InventoryItem(i) => &i.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Vehicle(_) => EntityKind::Vehicle,
            Self::Rental(_) => EntityKind::Rental,
            Self::InventoryItem(_) => EntityKind::InventoryItem,
        }
    }
}
