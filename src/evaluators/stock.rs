// Inventory stock rules. An item can carry several alerts at once, one per
// rule, but out-of-stock and low-stock exclude each other.

use crate::models::{
    AlertDescriptor, AlertOutcome, AlertType, EntityKind, InventorySnapshot, Priority,
};

use super::EvaluationContext;

pub fn evaluate(item: &InventorySnapshot, ctx: &EvaluationContext) -> Vec<AlertOutcome> {
    let mut outcomes = vec![
        AlertOutcome::from_option(AlertType::OutOfStock, out_of_stock(item, ctx)),
        AlertOutcome::from_option(AlertType::LowStock, low_stock(item, ctx)),
        AlertOutcome::from_option(AlertType::Overstock, overstock(item, ctx)),
        AlertOutcome::from_option(AlertType::HighValueItem, high_value(item, ctx)),
    ];
    // Without stock the inactive rule is settled; otherwise it needs history.
    if item.stock_on_hand <= 0.0 || item.recent_movements.is_some() {
        outcomes.push(AlertOutcome::from_option(
            AlertType::InactiveItem,
            inactive(item, ctx),
        ));
    }
    outcomes
}

fn alert(
    item: &InventorySnapshot,
    alert_type: AlertType,
    priority: Priority,
    ctx: &EvaluationContext,
) -> AlertDescriptor {
    AlertDescriptor::new(
        EntityKind::InventoryItem,
        &item.id,
        alert_type,
        priority,
        ctx.now,
    )
    .with_context("stock", item.stock_on_hand)
}

pub fn out_of_stock(item: &InventorySnapshot, ctx: &EvaluationContext) -> Option<AlertDescriptor> {
    if item.stock_on_hand != 0.0 {
        return None;
    }
    Some(
        alert(item, AlertType::OutOfStock, Priority::Critical, ctx)
            .with_title("Out of Stock")
            .with_message(format!("{} is out of stock", item.label())),
    )
}

pub fn low_stock(item: &InventorySnapshot, ctx: &EvaluationContext) -> Option<AlertDescriptor> {
    let reorder_level = item.reorder_level.unwrap_or(0.0);
    let stock = item.stock_on_hand;
    if !(reorder_level > 0.0 && stock <= reorder_level && stock > 0.0) {
        return None;
    }
    Some(
        alert(item, AlertType::LowStock, Priority::Warning, ctx)
            .with_title("Low Stock")
            .with_message(format!(
                "{} is running low: {} left, reorder level is {}",
                item.label(),
                stock,
                reorder_level
            ))
            .with_context("reorderLevel", reorder_level),
    )
}

pub fn overstock(item: &InventorySnapshot, ctx: &EvaluationContext) -> Option<AlertDescriptor> {
    let max = item.max_stock_level?;
    if item.stock_on_hand <= max {
        return None;
    }
    Some(
        alert(item, AlertType::Overstock, Priority::Info, ctx)
            .with_title("Overstock")
            .with_message(format!(
                "{} exceeds its maximum stock level: {} on hand, maximum is {}",
                item.label(),
                item.stock_on_hand,
                max
            ))
            .with_context("maxStockLevel", max),
    )
}

pub fn high_value(item: &InventorySnapshot, ctx: &EvaluationContext) -> Option<AlertDescriptor> {
    let value = item.cost_value();
    let threshold = ctx.thresholds.high_value_threshold;
    if value <= threshold {
        return None;
    }
    Some(
        alert(item, AlertType::HighValueItem, Priority::Info, ctx)
            .with_title("High Value Item")
            .with_message(format!(
                "{} holds {:.2} in stock value",
                item.label(),
                value
            ))
            .with_context("costValue", value)
            .with_context("threshold", threshold),
    )
}

/// Stocked item that nothing has moved within the inactivity window.
/// Requires the movement count from the history lookup.
pub fn inactive(item: &InventorySnapshot, ctx: &EvaluationContext) -> Option<AlertDescriptor> {
    if item.stock_on_hand <= 0.0 {
        return None;
    }
    let movements = item.recent_movements?;
    if movements > 0 {
        return None;
    }
    let window = ctx.thresholds.inactive_window_days;
    Some(
        alert(item, AlertType::InactiveItem, Priority::Info, ctx)
            .with_title("Inactive Item")
            .with_message(format!(
                "{} has had no stock movement in {} days",
                item.label(),
                window
            ))
            .with_context("movementsInWindow", movements)
            .with_context("windowDays", window),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlertThresholds;
    use crate::evaluators::test_support::now;

    fn item(stock: f64) -> InventorySnapshot {
        InventorySnapshot {
            id: "I1".to_string(),
            name: "Oil Filter".to_string(),
            sku: Some("OF-1".to_string()),
            stock_on_hand: stock,
            reorder_level: Some(10.0),
            max_stock_level: None,
            unit_cost: Some(8.0),
            recent_movements: None,
        }
    }

    fn raised(item: &InventorySnapshot) -> Vec<(AlertType, Priority)> {
        let thresholds = AlertThresholds::default();
        let ctx = EvaluationContext::new(now(), &thresholds);
        evaluate(item, &ctx)
            .into_iter()
            .filter_map(|o| o.alert)
            .map(|a| (a.alert_type, a.priority))
            .collect()
    }

    #[test]
    fn test_out_of_stock_excludes_low_stock() {
        assert_eq!(
            raised(&item(0.0)),
            vec![(AlertType::OutOfStock, Priority::Critical)]
        );
    }

    #[test]
    fn test_low_stock_excludes_out_of_stock() {
        assert_eq!(
            raised(&item(5.0)),
            vec![(AlertType::LowStock, Priority::Warning)]
        );
        assert_eq!(
            raised(&item(10.0)),
            vec![(AlertType::LowStock, Priority::Warning)]
        );
        assert!(raised(&item(11.0)).is_empty());
    }

    #[test]
    fn test_zero_reorder_level_never_low() {
        let mut i = item(1.0);
        i.reorder_level = Some(0.0);
        assert!(raised(&i).is_empty());
        i.reorder_level = None;
        assert!(raised(&i).is_empty());
    }

    #[test]
    fn test_overstock() {
        let mut i = item(120.0);
        i.max_stock_level = Some(100.0);
        assert_eq!(raised(&i), vec![(AlertType::Overstock, Priority::Info)]);
        i.stock_on_hand = 100.0;
        assert!(raised(&i).is_empty());
    }

    #[test]
    fn test_high_value_is_strictly_above_threshold() {
        let mut i = item(625.0);
        assert!(raised(&i).is_empty());
        i.stock_on_hand = 626.0;
        assert_eq!(raised(&i), vec![(AlertType::HighValueItem, Priority::Info)]);
    }

    #[test]
    fn test_inactive_needs_stock_and_no_movement() {
        let mut i = item(50.0);
        i.recent_movements = Some(0);
        assert_eq!(raised(&i), vec![(AlertType::InactiveItem, Priority::Info)]);

        i.recent_movements = Some(3);
        assert!(raised(&i).is_empty());

        i.stock_on_hand = 0.0;
        i.recent_movements = Some(0);
        assert_eq!(
            raised(&i),
            vec![(AlertType::OutOfStock, Priority::Critical)]
        );
    }

    #[test]
    fn test_outcomes_cover_all_types_when_history_known() {
        let thresholds = AlertThresholds::default();
        let ctx = EvaluationContext::new(now(), &thresholds);
        let mut i = item(20.0);
        i.recent_movements = Some(1);
        let types: Vec<AlertType> = evaluate(&i, &ctx).iter().map(|o| o.alert_type).collect();
        assert_eq!(types, AlertType::for_kind(EntityKind::InventoryItem));
    }

    #[test]
    fn test_inactive_outcome_without_history() {
        let thresholds = AlertThresholds::default();
        let ctx = EvaluationContext::new(now(), &thresholds);
        let types = |i: &InventorySnapshot| -> Vec<AlertType> {
            evaluate(i, &ctx).iter().map(|o| o.alert_type).collect()
        };

        // Unknown history on a stocked item leaves the inactive alert alone.
        assert!(!types(&item(50.0)).contains(&AlertType::InactiveItem));

        // An empty item can never be inactive, so the alert is cleared.
        let empty = item(0.0);
        let outcomes = evaluate(&empty, &ctx);
        let inactive = outcomes
            .iter()
            .find(|o| o.alert_type == AlertType::InactiveItem)
            .unwrap();
        assert!(inactive.alert.is_none());
    }

    #[test]
    fn test_low_stock_message() {
        let thresholds = AlertThresholds::default();
        let ctx = EvaluationContext::new(now(), &thresholds);
        let alert = low_stock(&item(5.0), &ctx).unwrap();
        assert_eq!(
            alert.message,
            "Oil Filter (SKU: OF-1) is running low: 5 left, reorder level is 10"
        );
        assert_eq!(alert.threshold_context["reorderLevel"], 10.0);
    }
}
