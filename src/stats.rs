//! Aggregate statistics over a finalized record list

use crate::record::{NetTypeTag, Record, Validity};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Label counts in a fixed order
///
/// Serializes as a JSON object whose keys keep this order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    entries: Vec<(String, usize)>,
}

impl Tally {
    /// Empty tally
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one to `label`, appending it if unseen
    pub fn bump(&mut self, label: &str) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((label.to_string(), 1)),
        }
    }

    /// Count for `label` (0 if unseen)
    pub fn get(&self, label: &str) -> usize {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map_or(0, |(_, c)| *c)
    }

    /// Labels and counts in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(l, c)| (l.as_str(), *c))
    }

    /// Number of distinct labels
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was counted
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reorders by descending count; ties keep their first-seen order
    fn sort_by_count_desc(&mut self) {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
    }
}

impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, count) in &self.entries {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

/// Latency distribution of reachable records, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    /// Fastest
    pub min: f64,
    /// Slowest
    pub max: f64,
    /// Mean, rounded to two decimals
    pub avg: f64,
    /// Upper median (`sorted[len / 2]`)
    pub median: f64,
}

impl LatencySummary {
    /// Summarizes `latencies`; `None` when empty
    pub fn from_latencies(latencies: &[f64]) -> Option<Self> {
        if latencies.is_empty() {
            return None;
        }
        let mut sorted = latencies.to_vec();
        sorted.sort_by(f64::total_cmp);
        let sum: f64 = sorted.iter().sum();
        let avg = (sum / sorted.len() as f64 * 100.0).round() / 100.0;
        Some(Self {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            avg,
            median: sorted[sorted.len() / 2],
        })
    }
}

/// Counts and distributions consumed by the report sinks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    /// Records in the list
    pub total: usize,
    /// Probed and reachable
    pub reachable: usize,
    /// Probed and unreachable
    pub unreachable: usize,
    /// Never probed
    pub untested: usize,
    /// Records per country (`Unknown` when empty), most frequent first
    pub by_country: Tally,
    /// Records per normalized network type, always listing all three tags
    pub by_net_type: Tally,
    /// Records per source, first-seen order
    pub by_source: Tally,
    /// Records per category, first-seen order
    pub by_category: Tally,
    /// Latency distribution of reachable records
    pub latency: Option<LatencySummary>,
}

impl Statistics {
    /// Computes statistics over `records`
    ///
    /// # Example
    ///
    /// ```
    /// use ip_harvest::{Record, Statistics};
    ///
    /// let mut a = Record::new("1.1.1.1", Some(443), "s", "cloudflare");
    /// a.country = "US".into();
    /// let b = Record::new("2.2.2.2", None, "s", "cloudflare");
    ///
    /// let stats = Statistics::compute(&[a, b]);
    /// assert_eq!(stats.total, 2);
    /// assert_eq!(stats.untested, 2);
    /// assert_eq!(stats.by_country.get("Unknown"), 1);
    /// assert!(stats.latency.is_none());
    /// ```
    pub fn compute(records: &[Record]) -> Self {
        let mut by_country = Tally::new();
        let mut by_net_type = Tally::new();
        let mut by_source = Tally::new();
        let mut by_category = Tally::new();
        let (mut reachable, mut unreachable) = (0, 0);
        let mut latencies = Vec::new();

        for tag in [
            NetTypeTag::Datacenter,
            NetTypeTag::Residential,
            NetTypeTag::Unknown,
        ] {
            by_net_type.entries.push((tag.as_str().to_string(), 0));
        }

        for record in records {
            let country = if record.country.is_empty() {
                "Unknown"
            } else {
                record.country.as_str()
            };
            by_country.bump(country);
            by_net_type.bump(record.net_type_tag().as_str());
            by_source.bump(&record.source);
            by_category.bump(&record.category);

            match record.valid {
                Validity::Reachable => {
                    reachable += 1;
                    if let Some(latency) = record.latency_ms {
                        latencies.push(latency);
                    }
                }
                Validity::Unreachable => unreachable += 1,
                Validity::Unknown => {}
            }
        }
        by_country.sort_by_count_desc();

        Self {
            total: records.len(),
            reachable,
            unreachable,
            untested: records.len() - reachable - unreachable,
            by_country,
            by_net_type,
            by_source,
            by_category,
            latency: LatencySummary::from_latencies(&latencies),
        }
    }

    /// Records not known to be dead (reachable plus untested)
    pub fn usable(&self) -> usize {
        self.reachable + self.untested
    }

    /// `count` as a percentage of the total, 0 for an empty list
    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total as f64
        }
    }
}

/// Up to `n` reachable records with a latency, fastest first
pub fn fastest(records: &[Record], n: usize) -> Vec<&Record> {
    let mut timed: Vec<&Record> = records
        .iter()
        .filter(|r| r.is_reachable() && r.latency_ms.is_some())
        .collect();
    timed.sort_by(|a, b| {
        a.latency_ms
            .unwrap_or(f64::MAX)
            .total_cmp(&b.latency_ms.unwrap_or(f64::MAX))
    });
    timed.truncate(n);
    timed
}
