//! Series Shaper
//! Turns finalized groups into ordered, flat records ready for a chart or table.

use crate::stats::{GroupRecord, Grouped};
use std::cmp::Ordering;

/// Sort applied to the groups before they become series entries.
pub enum SeriesOrder<K> {
    /// Keep first-encounter order.
    Encounter,
    /// Ascending by group key (chronological for dates, years and `YearMonth`).
    KeyAsc,
    /// Descending by a measure; equal values keep encounter order.
    ValueDesc(&'static str),
    ValueAsc(&'static str),
    /// Named comparator over keys, e.g. fiscal month order.
    ByKey(fn(&K, &K) -> Ordering),
}

impl<K: Ord> SeriesOrder<K> {
    fn compare(&self, a: &GroupRecord<K>, b: &GroupRecord<K>) -> Ordering {
        match self {
            SeriesOrder::Encounter => Ordering::Equal,
            SeriesOrder::KeyAsc => a.key.cmp(&b.key),
            SeriesOrder::ValueDesc(m) => b.get(m).total_cmp(&a.get(m)),
            SeriesOrder::ValueAsc(m) => a.get(m).total_cmp(&b.get(m)),
            SeriesOrder::ByKey(cmp) => cmp(&a.key, &b.key),
        }
    }
}

/// Sort `grouped` by `order`, keep at most `limit` groups and map each to an entry.
///
/// The sort is stable, so ties keep encounter order before truncation.
/// No groups means no entries; there is never a zero-valued placeholder.
pub fn shape<K, E>(
    grouped: &Grouped<K>,
    order: SeriesOrder<K>,
    limit: Option<usize>,
    entry: impl Fn(&GroupRecord<K>) -> E,
) -> Vec<E>
where
    K: Ord,
{
    let mut groups: Vec<&GroupRecord<K>> = grouped.groups.iter().collect();
    groups.sort_by(|a, b| order.compare(a, b));
    groups
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(entry)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::fiscal_month_cmp;
    use crate::stats::{group_by, Measure};

    struct Alarm {
        device: &'static str,
        month: &'static str,
        count: f64,
    }

    fn alarms() -> Vec<Alarm> {
        let a = |device, month, count| Alarm { device, month, count };
        vec![
            a("M3", "January", 2.0),
            a("M1", "April", 5.0),
            a("M2", "December", 2.0),
            a("M4", "April", 1.0),
        ]
    }

    fn by_device(rows: &[Alarm]) -> Grouped<String> {
        group_by(
            rows,
            |r| Some(r.device.to_string()),
            &[Measure::sum("alarms", |r: &Alarm| Some(r.count))],
        )
    }

    #[test]
    fn descending_value_is_stable_on_ties() {
        let grouped = by_device(&alarms());
        let keys = shape(&grouped, SeriesOrder::ValueDesc("alarms"), None, |g| g.key.clone());
        assert_eq!(keys, vec!["M1", "M3", "M2", "M4"]);
    }

    #[test]
    fn top_n_truncates_after_sorting() {
        let grouped = by_device(&alarms());
        let top = shape(&grouped, SeriesOrder::ValueDesc("alarms"), Some(2), |g| {
            (g.key.clone(), g.get("alarms"))
        });
        assert_eq!(top, vec![("M1".to_string(), 5.0), ("M3".to_string(), 2.0)]);
    }

    #[test]
    fn injected_fiscal_comparator() {
        let rows = alarms();
        let grouped = group_by(
            &rows,
            |r| Some(r.month.to_string()),
            &[Measure::sum("alarms", |r: &Alarm| Some(r.count))],
        );
        let months = shape(
            &grouped,
            SeriesOrder::ByKey(|a: &String, b: &String| fiscal_month_cmp(a, b)),
            None,
            |g| g.key.clone(),
        );
        assert_eq!(months, vec!["April", "December", "January"]);
    }

    #[test]
    fn key_and_value_ascending() {
        let grouped = by_device(&alarms());
        let keys = shape(&grouped, SeriesOrder::KeyAsc, None, |g| g.key.clone());
        assert_eq!(keys, vec!["M1", "M2", "M3", "M4"]);
        let keys = shape(&grouped, SeriesOrder::ValueAsc("alarms"), None, |g| g.key.clone());
        assert_eq!(keys, vec!["M4", "M3", "M2", "M1"]);
    }

    #[test]
    fn empty_groups_give_empty_series() {
        let grouped = by_device(&[]);
        let series = shape(&grouped, SeriesOrder::Encounter, Some(5), |g| g.get("alarms"));
        assert!(series.is_empty());
    }
}
