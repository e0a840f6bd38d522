//! Deduplication and ordering of extracted records
//!
//! Records are keyed by [`Record::address`]. The first record seen for a key
//! becomes its primary; later records for the same key are folded in by a
//! fixed two-tier rule:
//!
//! 1. a newcomer with a country replaces a primary without one, wholesale;
//! 2. otherwise a newcomer with a network type fills a primary without one,
//!    copying the network type and any location/ISP fields the primary lacks;
//! 3. anything else is discarded.
//!
//! The rule is order-sensitive: a replacement drops whatever the old primary
//! held. [`merge_records`] preserves that exactly.

use crate::record::Record;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// What happened to a record folded into an existing key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    /// The newcomer replaced the primary
    Replaced,
    /// The newcomer's network type and missing fields were copied in
    Merged,
    /// The newcomer was dropped
    Discarded,
}

/// Folds `incoming` into `primary`, returning what was done
pub fn fold_into(primary: &mut Record, incoming: Record) -> MergeAction {
    if !incoming.country.is_empty() && primary.country.is_empty() {
        *primary = incoming;
        MergeAction::Replaced
    } else if !incoming.net_type.is_empty() && primary.net_type.is_empty() {
        primary.net_type = incoming.net_type;
        fill_if_empty(&mut primary.country, incoming.country);
        fill_if_empty(&mut primary.region, incoming.region);
        fill_if_empty(&mut primary.city, incoming.city);
        fill_if_empty(&mut primary.isp, incoming.isp);
        MergeAction::Merged
    } else {
        MergeAction::Discarded
    }
}

fn fill_if_empty(field: &mut String, value: String) {
    if field.is_empty() && !value.is_empty() {
        *field = value;
    }
}

/// Deduplicates records by address key
///
/// Output keeps first-seen key order; a replaced primary keeps its key's
/// position. Exactly one record per distinct key is returned.
pub fn merge_records(records: impl IntoIterator<Item = Record>) -> Vec<Record> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<Record> = Vec::new();
    let (mut replaced, mut folded, mut discarded) = (0usize, 0usize, 0usize);

    for record in records {
        let key = record.address();
        match index.get(&key).copied() {
            Some(pos) => match fold_into(&mut merged[pos], record) {
                MergeAction::Replaced => replaced += 1,
                MergeAction::Merged => folded += 1,
                MergeAction::Discarded => discarded += 1,
            },
            None => {
                index.insert(key, merged.len());
                merged.push(record);
            }
        }
    }

    debug!(
        "Merged to {} unique records ({} replaced, {} merged, {} discarded)",
        merged.len(),
        replaced,
        folded,
        discarded
    );
    merged
}

/// Parses a dotted-quad into four integers for ordering
fn octets(ip: &str) -> Option<[u32; 4]> {
    let mut out = [0u32; 4];
    let mut parts = ip.split('.');
    for slot in &mut out {
        *slot = parts.next()?.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

/// Orders two records by address then port (absent port sorts as 0)
///
/// Records whose address does not parse as four integers sort after all
/// well-formed ones and compare equal among themselves.
pub fn compare_records(a: &Record, b: &Record) -> Ordering {
    match (octets(&a.ip), octets(&b.ip)) {
        (Some(x), Some(y)) => x
            .cmp(&y)
            .then_with(|| a.port.unwrap_or(0).cmp(&b.port.unwrap_or(0))),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sorts records in place (stable)
pub fn sort_records(records: &mut [Record]) {
    records.sort_by(compare_records);
}

/// Deduplicates then sorts: the full merge phase
///
/// # Example
///
/// ```
/// use ip_harvest::{merge::dedupe_and_sort, Record};
///
/// let records = vec![
///     Record::new("10.0.0.5", Some(80), "a", "proxy"),
///     Record::new("2.2.2.2", Some(1080), "a", "proxy"),
///     Record::new("2.2.2.2", Some(80), "a", "proxy"),
///     Record::new("10.0.0.5", Some(80), "b", "proxy"),
/// ];
///
/// let merged = dedupe_and_sort(records);
/// let order: Vec<_> = merged.iter().map(|r| r.address()).collect();
/// assert_eq!(order, ["2.2.2.2:80", "2.2.2.2:1080", "10.0.0.5:80"]);
/// ```
pub fn dedupe_and_sort(records: impl IntoIterator<Item = Record>) -> Vec<Record> {
    let mut merged = merge_records(records);
    sort_records(&mut merged);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ip: &str, port: Option<u16>) -> Record {
        Record::new(ip, port, "src", "cat")
    }

    #[test]
    fn test_first_record_is_primary() {
        let mut a = rec("1.1.1.1", Some(80));
        a.source = "first".to_string();
        let mut b = rec("1.1.1.1", Some(80));
        b.source = "second".to_string();

        let merged = merge_records(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, "first");
    }

    #[test]
    fn test_replace_discards_old_metadata() {
        let mut primary = rec("1.2.3.4", Some(80));
        primary.net_type = "DC".to_string();
        primary.isp = "Old ISP".to_string();
        let mut incoming = rec("1.2.3.4", Some(80));
        incoming.country = "US".to_string();

        assert_eq!(fold_into(&mut primary, incoming), MergeAction::Replaced);
        assert_eq!(primary.country, "US");
        assert_eq!(primary.net_type, "");
        assert_eq!(primary.isp, "");
    }

    #[test]
    fn test_merge_fills_only_empty_fields() {
        let mut primary = rec("1.2.3.4", Some(80));
        primary.country = "JP".to_string();
        primary.isp = "NTT".to_string();
        let mut incoming = rec("1.2.3.4", Some(80));
        incoming.net_type = "机房".to_string();
        incoming.country = "KR".to_string();
        incoming.city = "Seoul".to_string();
        incoming.isp = "KT".to_string();

        assert_eq!(fold_into(&mut primary, incoming), MergeAction::Merged);
        assert_eq!(primary.net_type, "机房");
        assert_eq!(primary.country, "JP");
        assert_eq!(primary.city, "Seoul");
        assert_eq!(primary.isp, "NTT");
    }

    #[test]
    fn test_disjoint_metadata_is_not_combined() {
        let mut primary = rec("1.2.3.4", None);
        primary.isp = "A".to_string();
        let mut incoming = rec("1.2.3.4", None);
        incoming.city = "B".to_string();

        assert_eq!(fold_into(&mut primary, incoming), MergeAction::Discarded);
        assert_eq!(primary.city, "");
    }

    #[test]
    fn test_port_distinguishes_keys() {
        let merged = merge_records(vec![
            rec("1.1.1.1", None),
            rec("1.1.1.1", Some(443)),
            rec("1.1.1.1", Some(80)),
        ]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_replacement_keeps_position() {
        let mut late = rec("1.1.1.1", Some(1));
        late.country = "DE".to_string();
        let merged = merge_records(vec![rec("1.1.1.1", Some(1)), rec("9.9.9.9", Some(1)), late]);
        assert_eq!(merged[0].address(), "1.1.1.1:1");
        assert_eq!(merged[0].country, "DE");
        assert_eq!(merged[1].address(), "9.9.9.9:1");
    }

    #[test]
    fn test_sort_numeric_not_lexical() {
        let mut records = vec![
            rec("10.0.0.5", Some(80)),
            rec("2.2.2.2", Some(1080)),
            rec("2.2.2.2", Some(80)),
        ];
        sort_records(&mut records);
        let order: Vec<_> = records.iter().map(|r| r.address()).collect();
        assert_eq!(order, ["2.2.2.2:80", "2.2.2.2:1080", "10.0.0.5:80"]);
    }

    #[test]
    fn test_absent_port_sorts_first() {
        let mut records = vec![rec("3.3.3.3", Some(1)), rec("3.3.3.3", None)];
        sort_records(&mut records);
        assert_eq!(records[0].port, None);
    }

    #[test]
    fn test_malformed_sort_last_in_original_order() {
        let mut records = vec![
            rec("not-an-ip", None),
            rec("9.9.9.9", None),
            rec("1.2.3", None),
            rec("1.1.1.1", None),
        ];
        sort_records(&mut records);
        let order: Vec<_> = records.iter().map(|r| r.ip.as_str()).collect();
        assert_eq!(order, ["1.1.1.1", "9.9.9.9", "not-an-ip", "1.2.3"]);
    }

    #[test]
    fn test_octets() {
        assert_eq!(octets("1.2.3.4"), Some([1, 2, 3, 4]));
        assert_eq!(octets("1.2.3"), None);
        assert_eq!(octets("1.2.3.4.5"), None);
        assert_eq!(octets("1.2.x.4"), None);
    }
}
