use crate::models::{AlertDescriptor, AlertType, EntityKind, Priority, RentalSnapshot};

use super::EvaluationContext;

/// Return reminder for open rentals. Closed rentals never alert, whatever
/// their end date.
pub fn evaluate(rental: &RentalSnapshot, ctx: &EvaluationContext) -> Option<AlertDescriptor> {
    if !rental.status.is_open() {
        return None;
    }
    let end = rental.end_date?;
    let days = ctx.days_until(end);

    if days > ctx.thresholds.rental_window_days {
        return None;
    }

    let (priority, title, message) = if days < 0 {
        (
            Priority::High,
            "Rental Overdue",
            format!("{} is overdue by {} days", rental.label, days.abs()),
        )
    } else {
        let when = match days {
            0 => "today".to_string(),
            1 => "tomorrow".to_string(),
            n => format!("in {} days", n),
        };
        (
            Priority::Medium,
            "Rental Due Back",
            format!("{} is due back {}", rental.label, when),
        )
    };

    Some(
        AlertDescriptor::new(
            EntityKind::Rental,
            &rental.id,
            AlertType::RentalReturnOverdue,
            priority,
            ctx.now,
        )
        .with_title(title)
        .with_message(message)
        .with_context("daysDifference", days)
        .with_context("endDate", end.to_string()),
    )
}
