use crate::models::{AlertDescriptor, AlertType, EntityKind, Priority, VehicleSnapshot};

use super::EvaluationContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    Insurance,
    Registration,
}

impl Document {
    fn alert_type(self) -> AlertType {
        match self {
            Self::Insurance => AlertType::InsuranceExpiry,
            Self::Registration => AlertType::RegistrationExpiry,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Insurance => "Insurance",
            Self::Registration => "Registration",
        }
    }
}

pub fn evaluate(
    vehicle: &VehicleSnapshot,
    document: Document,
    ctx: &EvaluationContext,
) -> Option<AlertDescriptor> {
    let expiry = match document {
        Document::Insurance => vehicle.insurance_expiry,
        Document::Registration => vehicle.registration_expiry,
    }?;
    let days = ctx.days_until(expiry);
    let thresholds = ctx.thresholds;

    if days > thresholds.expiry_window_days {
        return None;
    }

    let name = document.name();
    let (priority, title, message) = if days <= 0 {
        (
            Priority::High,
            format!("{} Expired", name),
            format!(
                "{} {} expired {} days ago",
                vehicle.label,
                name.to_lowercase(),
                days.abs()
            ),
        )
    } else {
        let priority = if days <= thresholds.expiry_urgent_days {
            Priority::Medium
        } else {
            Priority::Low
        };
        (
            priority,
            format!("{} Expiring Soon", name),
            format!(
                "{} {} expires in {} days",
                vehicle.label,
                name.to_lowercase(),
                days
            ),
        )
    };

    Some(
        AlertDescriptor::new(
            EntityKind::Vehicle,
            &vehicle.id,
            document.alert_type(),
            priority,
            ctx.now,
        )
        .with_title(title)
        .with_message(message)
        .with_context("daysDifference", days)
        .with_context("expiryDate", expiry.date().to_string()),
    )
}
