use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::alert::EntityKind;
use super::snapshot::{
    EntitySnapshot, InventorySnapshot, RentalSnapshot, RentalStatus, SnapshotError,
    VehicleSnapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityAction {
    #[default]
    Upsert,
    Delete,
}

/// Envelope published on the entity snapshot topic.
#[derive(Debug, Deserialize)]
pub struct EntityMessage {
    pub uuid: Option<String>,
    #[serde(default)]
    pub action: EntityAction,
    #[serde(alias = "entityKind")]
    pub entity_kind: EntityKind,
    #[serde(alias = "entityId", default, deserialize_with = "parse_id_option")]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
struct RawVehicle {
    make: Option<String>,
    model: Option<String>,
    name: Option<String>,
    #[serde(alias = "licensePlate", alias = "plate")]
    license_plate: Option<String>,
    #[serde(alias = "currentOdometer", alias = "odometer", default, deserialize_with = "parse_i64_option")]
    current_odometer: Option<i64>,
    #[serde(alias = "nextOilChangeOdometer", default, deserialize_with = "parse_i64_option")]
    next_oil_change_odometer: Option<i64>,
    #[serde(alias = "insuranceExpiry", alias = "insurance_expiry_date", default, deserialize_with = "parse_datetime_option")]
    insurance_expiry: Option<NaiveDateTime>,
    #[serde(alias = "registrationExpiry", alias = "registration_expiry_date", default, deserialize_with = "parse_datetime_option")]
    registration_expiry: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
struct RawRental {
    status: Option<String>,
    #[serde(alias = "endDate", alias = "end_time", default, deserialize_with = "parse_datetime_option")]
    end_date: Option<NaiveDateTime>,
    #[serde(alias = "customerName")]
    customer_name: Option<String>,
    #[serde(alias = "vehicleLabel", alias = "vehicle")]
    vehicle_label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInventoryItem {
    name: Option<String>,
    sku: Option<String>,
    #[serde(alias = "stockOnHand", alias = "current_stock", alias = "quantity", default, deserialize_with = "parse_f64_strict")]
    stock_on_hand: Option<f64>,
    #[serde(alias = "reorderLevel", alias = "min_stock_level", default, deserialize_with = "parse_f64_option")]
    reorder_level: Option<f64>,
    #[serde(alias = "maxStockLevel", default, deserialize_with = "parse_f64_option")]
    max_stock_level: Option<f64>,
    #[serde(alias = "unitCost", alias = "cost_price", default, deserialize_with = "parse_f64_option")]
    unit_cost: Option<f64>,
}

impl EntityMessage {
    pub fn entity_id(&self) -> Result<&str, SnapshotError> {
        match self.entity_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(SnapshotError::MissingEntityId),
        }
    }

    /// Normalise the raw record into the fixed shape the evaluators expect.
    pub fn into_snapshot(self) -> Result<EntitySnapshot, SnapshotError> {
        let id = self.entity_id()?.to_string();
        let data = match self.data {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let invalid = |kind: EntityKind, id: &str| {
            let entity_id = id.to_string();
            move |source| SnapshotError::InvalidRecord {
                kind: kind.as_str(),
                entity_id,
                source,
            }
        };

        match self.entity_kind {
            EntityKind::Vehicle => {
                let raw: RawVehicle =
                    serde_json::from_value(data).map_err(invalid(EntityKind::Vehicle, &id))?;
                let label = vehicle_label(&raw, &id);
                Ok(EntitySnapshot::Vehicle(VehicleSnapshot {
                    id,
                    label,
                    current_odometer: raw.current_odometer,
                    next_oil_change_odometer: raw.next_oil_change_odometer,
                    insurance_expiry: raw.insurance_expiry,
                    registration_expiry: raw.registration_expiry,
                }))
            }
            EntityKind::Rental => {
                let raw: RawRental =
                    serde_json::from_value(data).map_err(invalid(EntityKind::Rental, &id))?;
                let label = match (raw.customer_name, raw.vehicle_label) {
                    (Some(customer), Some(vehicle)) => format!("{} - {}", vehicle, customer),
                    (Some(customer), None) => format!("Rental {} ({})", id, customer),
                    (None, Some(vehicle)) => vehicle,
                    (None, None) => format!("Rental {}", id),
                };
                Ok(EntitySnapshot::Rental(RentalSnapshot {
                    label,
                    status: raw
                        .status
                        .as_deref()
                        .map(RentalStatus::parse)
                        .unwrap_or(RentalStatus::Unknown),
                    end_date: raw.end_date,
                    id,
                }))
            }
            EntityKind::InventoryItem => {
                let raw: RawInventoryItem = serde_json::from_value(data)
                    .map_err(invalid(EntityKind::InventoryItem, &id))?;
                Ok(EntitySnapshot::InventoryItem(InventorySnapshot {
                    name: raw.name.unwrap_or_else(|| format!("Item {}", id)),
                    sku: raw.sku.filter(|s| !s.trim().is_empty()),
                    // Absent stock is a real zero, unlike the other fields.
                    stock_on_hand: raw.stock_on_hand.unwrap_or(0.0),
                    reorder_level: raw.reorder_level,
                    max_stock_level: raw.max_stock_level,
                    unit_cost: raw.unit_cost,
                    recent_movements: None,
                    id,
                }))
            }
        }
    }
}

fn vehicle_label(raw: &RawVehicle, id: &str) -> String {
    let name = raw.name.clone().or_else(|| {
        let parts: Vec<&str> = [raw.make.as_deref(), raw.model.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    });
    let plate = raw.license_plate.as_deref().filter(|p| !p.trim().is_empty());

    match (name, plate) {
        (Some(name), Some(plate)) => format!("{} ({})", name, plate),
        (Some(name), None) => name,
        (None, Some(plate)) => plate.to_string(),
        (None, None) => format!("Vehicle {}", id),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Integer(i64),
    Float(f64),
}

fn parse_id_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<StringOrNumber> = Option::deserialize(deserializer)?;
    Ok(match v {
        Some(StringOrNumber::String(s)) => Some(s),
        Some(StringOrNumber::Integer(i)) => Some(i.to_string()),
        Some(StringOrNumber::Float(f)) => Some(f.to_string()),
        None => None,
    })
}

fn number_from(v: Option<StringOrNumber>) -> Result<Option<f64>, String> {
    match v {
        Some(StringOrNumber::Integer(i)) => Ok(Some(i as f64)),
        Some(StringOrNumber::Float(f)) => Ok(Some(f)),
        Some(StringOrNumber::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse::<f64>()
                    .map(Some)
                    .map_err(|_| format!("expected a number, got '{}'", s))
            }
        }
        None => Ok(None),
    }
}

/// Optional numeric field: unparseable input counts as absent.
fn parse_f64_option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<StringOrNumber> = Option::deserialize(deserializer)?;
    Ok(number_from(v).ok().flatten().filter(|f| f.is_finite()))
}

/// Stock level: absence is allowed, garbage or a negative count is an error.
fn parse_f64_strict<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<StringOrNumber> = Option::deserialize(deserializer)?;
    match number_from(v).map_err(serde::de::Error::custom)? {
        Some(f) if !f.is_finite() => Err(serde::de::Error::custom("number is not finite")),
        Some(f) if f < 0.0 => Err(serde::de::Error::custom(format!("negative stock {}", f))),
        other => Ok(other),
    }
}

fn parse_i64_option<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(parse_f64_option(deserializer)?.map(|f| f.round() as i64))
}

fn parse_datetime_option<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<String> = Option::deserialize(deserializer).unwrap_or(None);
    Ok(v.as_deref().and_then(parse_datetime))
}

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
