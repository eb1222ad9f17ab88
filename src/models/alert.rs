use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Vehicle,
    #[serde(alias = "inventoryItem", alias = "inventory")]
    InventoryItem,
    Rental,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vehicle => "vehicle",
            Self::InventoryItem => "inventory_item",
            Self::Rental => "rental",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    OilChange,
    InsuranceExpiry,
    RegistrationExpiry,
    RentalReturnOverdue,
    OutOfStock,
    LowStock,
    Overstock,
    InactiveItem,
    HighValueItem,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OilChange => "oil_change",
            Self::InsuranceExpiry => "insurance_expiry",
            Self::RegistrationExpiry => "registration_expiry",
            Self::RentalReturnOverdue => "rental_return_overdue",
            Self::OutOfStock => "out_of_stock",
            Self::LowStock => "low_stock",
            Self::Overstock => "overstock",
            Self::InactiveItem => "inactive_item",
            Self::HighValueItem => "high_value_item",
        }
    }

    /// Every alert type an entity of the given kind can carry.
    pub fn for_kind(kind: EntityKind) -> &'static [AlertType] {
        match kind {
            EntityKind::Vehicle => &[
                Self::OilChange,
                Self::InsuranceExpiry,
                Self::RegistrationExpiry,
            ],
            EntityKind::Rental => &[Self::RentalReturnOverdue],
            EntityKind::InventoryItem => &[
                Self::OutOfStock,
                Self::LowStock,
                Self::Overstock,
                Self::HighValueItem,
                Self::InactiveItem,
            ],
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity.
///
/// Vehicle alerts historically speak `high/medium/low` and inventory alerts
/// `critical/warning/info`. Both vocabularies are kept for rendering but sort
/// and aggregate on a single scale: critical > high = warning > medium > low = info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Warning,
    Medium,
    Low,
    Info,
}

impl Priority {
    /// Position on the unified scale, 0 being the most severe.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High | Self::Warning => 1,
            Self::Medium => 2,
            Self::Low | Self::Info => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Warning => "warning",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what}: '{value}'")]
pub struct UnknownVariant {
    pub what: &'static str,
    pub value: String,
}

fn parse_variant<T: Copy>(
    what: &'static str,
    value: &str,
    all: &[T],
    name: fn(&T) -> &'static str,
) -> Result<T, UnknownVariant> {
    all.iter()
        .find(|v| name(*v) == value)
        .copied()
        .ok_or_else(|| UnknownVariant {
            what,
            value: value.to_string(),
        })
}

impl FromStr for EntityKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(
            "entity kind",
            s,
            &[Self::Vehicle, Self::InventoryItem, Self::Rental],
            Self::as_str,
        )
    }
}

impl FromStr for AlertType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(
            "alert type",
            s,
            &[
                Self::OilChange,
                Self::InsuranceExpiry,
                Self::RegistrationExpiry,
                Self::RentalReturnOverdue,
                Self::OutOfStock,
                Self::LowStock,
                Self::Overstock,
                Self::InactiveItem,
                Self::HighValueItem,
            ],
            Self::as_str,
        )
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(
            "priority",
            s,
            &[
                Self::Critical,
                Self::High,
                Self::Warning,
                Self::Medium,
                Self::Low,
                Self::Info,
            ],
            Self::as_str,
        )
    }
}

/// Identity under which at most one alert may be active.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlertKey {
    pub entity_id: String,
    pub alert_type: AlertType,
}

impl AlertKey {
    pub fn new(entity_id: impl Into<String>, alert_type: AlertType) -> Self {
        Self {
            entity_id: entity_id.into(),
            alert_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDescriptor {
    pub id: String,
    pub entity_id: String,
    pub entity_kind: EntityKind,
    pub alert_type: AlertType,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub threshold_context: BTreeMap<String, Value>,
}

impl AlertDescriptor {
    pub fn new(
        entity_kind: EntityKind,
        entity_id: &str,
        alert_type: AlertType,
        priority: Priority,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: format!(
                "{}-{}-{}",
                entity_id,
                alert_type,
                created_at.and_utc().timestamp_millis()
            ),
            entity_id: entity_id.to_string(),
            entity_kind,
            alert_type,
            priority,
            title: String::new(),
            message: String::new(),
            created_at,
            is_read: false,
            threshold_context: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.threshold_context.insert(key.to_string(), value.into());
        self
    }

    pub fn key(&self) -> AlertKey {
        AlertKey::new(self.entity_id.clone(), self.alert_type)
    }

    /// True when both descriptors would render identically, ignoring
    /// instance identity (id, creation time, read flag).
    pub fn same_content(&self, other: &AlertDescriptor) -> bool {
        self.entity_id == other.entity_id
            && self.entity_kind == other.entity_kind
            && self.alert_type == other.alert_type
            && self.priority == other.priority
            && self.title == other.title
            && self.message == other.message
            && self.threshold_context == other.threshold_context
    }
}

/// Result of evaluating one alert type for one entity: `Some` means the alert
/// must be active with this content, `None` means it must not be active.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertOutcome {
    pub alert_type: AlertType,
    pub alert: Option<AlertDescriptor>,
}

impl AlertOutcome {
    pub fn raise(alert: AlertDescriptor) -> Self {
        Self {
            alert_type: alert.alert_type,
            alert: Some(alert),
        }
    }

    pub fn clear(alert_type: AlertType) -> Self {
        Self {
            alert_type,
            alert: None,
        }
    }

    pub fn from_option(alert_type: AlertType, alert: Option<AlertDescriptor>) -> Self {
        Self { alert_type, alert }
    }
}
