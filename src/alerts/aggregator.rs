use serde::Serialize;

use crate::models::{AlertDescriptor, Priority};

/// Alert counts on the unified priority scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertSummary {
    pub total: usize,
    pub critical: usize,
    /// `high` and `warning` alerts.
    pub high: usize,
    pub medium: usize,
    /// `low` and `info` alerts.
    pub low: usize,
    pub unread: usize,
}

pub fn summarize(alerts: &[AlertDescriptor]) -> AlertSummary {
    alerts.iter().fold(AlertSummary::default(), |mut summary, alert| {
        summary.total += 1;
        match alert.priority.rank() {
            0 => summary.critical += 1,
            1 => summary.high += 1,
            2 => summary.medium += 1,
            _ => summary.low += 1,
        }
        if !alert.is_read {
            summary.unread += 1;
        }
        summary
    })
}

/// Most severe first; within a rank, oldest first.
pub fn sorted_by_priority(mut alerts: Vec<AlertDescriptor>) -> Vec<AlertDescriptor> {
    alerts.sort_by_key(|a| (a.priority.rank(), a.created_at));
    alerts
}

pub fn top_n(alerts: Vec<AlertDescriptor>, n: usize) -> Vec<AlertDescriptor> {
    let mut sorted = sorted_by_priority(alerts);
    sorted.truncate(n);
    sorted
}

pub fn count_at_least(alerts: &[AlertDescriptor], priority: Priority) -> usize {
    alerts
        .iter()
        .filter(|a| a.priority.rank() <= priority.rank())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertType, EntityKind};
    use chrono::NaiveDate;

    fn alert(id: &str, priority: Priority, minute: u32) -> AlertDescriptor {
        let created = NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(9, minute, 0)
            .unwrap();
        AlertDescriptor::new(EntityKind::InventoryItem, id, AlertType::LowStock, priority, created)
    }

    fn sample() -> Vec<AlertDescriptor> {
        vec![
            alert("a", Priority::Info, 0),
            alert("b", Priority::Critical, 5),
            alert("c", Priority::Warning, 3),
            alert("d", Priority::High, 1),
            alert("e", Priority::Medium, 2),
            alert("f", Priority::Low, 4),
            alert("g", Priority::Critical, 1),
        ]
    }

    #[test]
    fn test_summary_counts_add_up() {
        let mut alerts = sample();
        alerts[0].is_read = true;
        let summary = summarize(&alerts);
        assert_eq!(
            summary,
            AlertSummary {
                total: 7,
                critical: 2,
                high: 2,
                medium: 1,
                low: 2,
                unread: 6,
            }
        );
        assert_eq!(
            summary.critical + summary.high + summary.medium + summary.low,
            summary.total
        );
    }

    #[test]
    fn test_sorted_by_rank_then_age() {
        let ids: Vec<String> = sorted_by_priority(sample())
            .into_iter()
            .map(|a| a.entity_id)
            .collect();
        assert_eq!(ids, vec!["g", "b", "d", "c", "e", "a", "f"]);
    }

    #[test]
    fn test_top_n() {
        let top = top_n(sample(), 3);
        let ids: Vec<&str> = top.iter().map(|a| a.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["g", "b", "d"]);
        assert_eq!(top_n(sample(), 50).len(), 7);
        assert!(top_n(Vec::new(), 3).is_empty());
    }

    #[test]
    fn test_count_at_least() {
        assert_eq!(count_at_least(&sample(), Priority::Critical), 2);
        assert_eq!(count_at_least(&sample(), Priority::Warning), 4);
        assert_eq!(count_at_least(&sample(), Priority::Info), 7);
    }
}
