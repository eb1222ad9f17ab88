// Threshold evaluators.
//
// Each evaluator maps a normalised entity snapshot to zero or one alert per
// alert type. They never touch the store and take the clock from the
// context, so the same input always yields the same alert content.

pub mod document_expiry;
pub mod oil_change;
pub mod rental;
pub mod stock;

use chrono::NaiveDateTime;

use crate::config::AlertThresholds;
use crate::models::{AlertOutcome, AlertType, EntitySnapshot};

const SECONDS_PER_DAY: i64 = 86_400;

pub struct EvaluationContext<'a> {
    pub now: NaiveDateTime,
    pub thresholds: &'a AlertThresholds,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(now: NaiveDateTime, thresholds: &'a AlertThresholds) -> Self {
        Self { now, thresholds }
    }

    /// Whole days until `target`, rounded up. Anything later today is 0,
    /// anything earlier today or before is negative or 0.
    pub fn days_until(&self, target: NaiveDateTime) -> i64 {
        let secs = (target - self.now).num_seconds();
        -((-secs).div_euclid(SECONDS_PER_DAY))
    }
}

/// Evaluate every alert type owned by the snapshot's entity kind.
///
/// The returned outcomes cover each type exactly once, except the inactive
/// item rule which is left out while its movement count is unknown.
pub fn evaluate(snapshot: &EntitySnapshot, ctx: &EvaluationContext) -> Vec<AlertOutcome> {
    match snapshot {
        EntitySnapshot::Vehicle(vehicle) => vec![
            AlertOutcome::from_option(AlertType::OilChange, oil_change::evaluate(vehicle, ctx)),
            AlertOutcome::from_option(
                AlertType::InsuranceExpiry,
                document_expiry::evaluate(vehicle, document_expiry::Document::Insurance, ctx),
            ),
            AlertOutcome::from_option(
                AlertType::RegistrationExpiry,
                document_expiry::evaluate(vehicle, document_expiry::Document::Registration, ctx),
            ),
        ],
        EntitySnapshot::Rental(rental) => vec![AlertOutcome::from_option(
            AlertType::RentalReturnOverdue,
            rental::evaluate(rental, ctx),
        )],
        EntitySnapshot::InventoryItem(item) => stock::evaluate(item, ctx),
    }
}
