//! Report data model
//!
//! Count tables are kept in first-seen insertion order while accumulating.
//! The JSON encoding preserves that order as-is; the plain-text and HTML
//! renderers stable-sort a copy descending by count just before formatting.

use serde::{Deserialize, Serialize};

/// One key (protocol or country name) and its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountEntry {
    pub key: String,
    pub count: i64,
}

/// Insertion-ordered frequency table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountTable(Vec<CountEntry>);

impl CountTable {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_entries(entries: Vec<CountEntry>) -> Self {
        Self(entries)
    }

    /// Increment `key` by one; the first occurrence establishes its position.
    pub fn increment(&mut self, key: &str) {
        if let Some(entry) = self.0.iter_mut().find(|e| e.key == key) {
            entry.count += 1;
        } else {
            self.0.push(CountEntry {
                key: key.to_string(),
                count: 1,
            });
        }
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.0.iter().find(|e| e.key == key).map(|e| e.count)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CountEntry> {
        self.0.iter()
    }

    /// Entries sorted descending by count; ties keep insertion order.
    pub fn sorted_desc(&self) -> Vec<CountEntry> {
        let mut sorted = self.0.clone();
        sorted.sort_by(|a, b| b.count.cmp(&a.count));
        sorted
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Aggregate over one lookback window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubReport {
    pub from_to: String,
    pub total_count: i64,
    pub protocol_counts: CountTable,
    pub country_counts: CountTable,
}

/// A full report: the two lookback windows plus an optional narrative
/// comparison produced by the external summarizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "last_days_report1")]
    pub window_a: SubReport,
    #[serde(rename = "last_days_report2")]
    pub window_b: SubReport,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<String>,
}
