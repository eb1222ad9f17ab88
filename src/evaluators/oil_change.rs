use crate::models::{AlertDescriptor, AlertType, EntityKind, Priority, VehicleSnapshot};

use super::EvaluationContext;

/// Oil change due by odometer. No alert when either reading is missing.
pub fn evaluate(vehicle: &VehicleSnapshot, ctx: &EvaluationContext) -> Option<AlertDescriptor> {
    let current = vehicle.current_odometer?;
    let next = vehicle.next_oil_change_odometer?;
    let km_until_service = next - current;
    let thresholds = ctx.thresholds;

    if km_until_service > thresholds.oil_change_window_km {
        return None;
    }

    let (priority, title, message) = if km_until_service <= 0 {
        (
            Priority::High,
            "Oil Change Overdue",
            format!(
                "{} oil change overdue by {} km",
                vehicle.label,
                km_until_service.abs()
            ),
        )
    } else {
        let priority = if km_until_service <= thresholds.oil_change_urgent_km {
            Priority::Medium
        } else {
            Priority::Low
        };
        (
            priority,
            "Oil Change Due",
            format!(
                "{} needs oil change in {} km",
                vehicle.label, km_until_service
            ),
        )
    };

    Some(
        AlertDescriptor::new(
            EntityKind::Vehicle,
            &vehicle.id,
            AlertType::OilChange,
            priority,
            ctx.now,
        )
        .with_title(title)
        .with_message(message)
        .with_context("kmUntilService", km_until_service)
        .with_context("currentOdometer", current)
        .with_context("nextOilChangeOdometer", next),
    )
}
