//! Time-windowed aggregation over the ban action log.

use chrono::{DateTime, Duration, Utc};

use crate::models::BanAction;
use crate::report::models::{CountTable, Report, SubReport};
use crate::storage::{SqliteStorage, StorageResult};

/// Lookback length of the first report window, in days.
pub const DAYS_WINDOW_A: i64 = 7;
/// Lookback length of the second report window, in days.
pub const DAYS_WINDOW_B: i64 = 30;
/// How much further into the past the comparison baseline report is anchored.
pub const OLDER_REPORT_OFFSET_DAYS: i64 = 7;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Build a report anchored at `reference` with two independent lookback
/// windows of `days_a` and `days_b` days.
///
/// Each window scans `created_at >= reference - window` with no upper bound:
/// a shifted reference moves only the lower bound, so rows newer than the
/// reference instant still match. That asymmetry is a compatibility contract
/// with existing consumers, not an oversight; see the integration tests.
pub async fn generate_report(
    storage: &SqliteStorage,
    reference: DateTime<Utc>,
    days_a: i64,
    days_b: i64,
) -> StorageResult<Report> {
    let window_a = aggregate_window(storage, reference, days_a).await?;
    let window_b = aggregate_window(storage, reference, days_b).await?;

    Ok(Report {
        window_a,
        window_b,
        insight: None,
    })
}

async fn aggregate_window(
    storage: &SqliteStorage,
    reference: DateTime<Utc>,
    days: i64,
) -> StorageResult<SubReport> {
    let from = reference - Duration::days(days);
    let actions = storage.list_actions_since(from.timestamp()).await?;

    Ok(accumulate(&actions, format_range(from, reference)))
}

/// Fold a batch of ban actions into a sub-report. Pure; the ordering of
/// `actions` decides the insertion order of both count tables.
pub fn accumulate(actions: &[BanAction], from_to: String) -> SubReport {
    let mut protocol_counts = CountTable::new();
    let mut country_counts = CountTable::new();

    for action in actions {
        protocol_counts.increment(&action.protocol);
        if let Some(location) = &action.location {
            country_counts.increment(location);
        }
    }

    SubReport {
        from_to,
        total_count: actions.len() as i64,
        protocol_counts,
        country_counts,
    }
}

fn format_range(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    format!(
        "{} ~ {}",
        from.format(DATETIME_FORMAT),
        to.format(DATETIME_FORMAT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(id: i64, protocol: &str, location: Option<&str>) -> BanAction {
        BanAction {
            id,
            protocol: protocol.to_string(),
            created_at: 0,
            ip: "8.8.8.8".to_string(),
            location: location.map(str::to_string),
        }
    }

    #[test]
    fn test_accumulate_counts_and_order() {
        let actions = vec![
            action(1, "ssh", Some("China")),
            action(2, "ftp", Some("Russia")),
            action(3, "ssh", None),
            action(4, "ssh", Some("China")),
        ];

        let sub = accumulate(&actions, "from ~ to".to_string());
        assert_eq!(sub.total_count, 4);
        assert_eq!(sub.protocol_counts.get("ssh"), Some(3));
        assert_eq!(sub.protocol_counts.get("ftp"), Some(1));

        // the null-location action counts toward the total but not any country
        assert_eq!(sub.country_counts.get("China"), Some(2));
        assert_eq!(sub.country_counts.get("Russia"), Some(1));
        assert_eq!(sub.country_counts.len(), 2);

        let keys: Vec<&str> = sub.protocol_counts.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["ssh", "ftp"]);
    }

    #[test]
    fn test_accumulate_empty() {
        let sub = accumulate(&[], "from ~ to".to_string());
        assert_eq!(sub.total_count, 0);
        assert!(sub.protocol_counts.is_empty());
        assert!(sub.country_counts.is_empty());
    }

    #[test]
    fn test_format_range_second_precision() {
        let from = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let to = DateTime::from_timestamp(1_700_604_800, 0).unwrap();
        assert_eq!(
            format_range(from, to),
            "2023-11-14 22:13:20 ~ 2023-11-21 22:13:20"
        );
    }
}
