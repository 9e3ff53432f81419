//! Grouping & Reduction Engine
//!
//! Single pass over the filtered rows: each row is keyed, its bucket is created on
//! first sight, and every measure's running state is accumulated. Buckets are only
//! readable after `finish`, which turns running state into final values.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Count,
    Average,
    Min,
    Max,
    CountDistinct,
}

/// Where a measure reads its input from.
enum Source<T> {
    Rows,
    Number(fn(&T) -> Option<f64>),
    Key(fn(&T) -> Option<String>),
}

/// A named reduction over one row attribute.
pub struct Measure<T> {
    pub name: &'static str,
    source: Source<T>,
    reducer: Reducer,
}

impl<T> Measure<T> {
    fn numeric(name: &'static str, value: fn(&T) -> Option<f64>, reducer: Reducer) -> Self {
        Self {
            name,
            source: Source::Number(value),
            reducer,
        }
    }

    pub fn sum(name: &'static str, value: fn(&T) -> Option<f64>) -> Self {
        Self::numeric(name, value, Reducer::Sum)
    }

    pub fn average(name: &'static str, value: fn(&T) -> Option<f64>) -> Self {
        Self::numeric(name, value, Reducer::Average)
    }

    pub fn min(name: &'static str, value: fn(&T) -> Option<f64>) -> Self {
        Self::numeric(name, value, Reducer::Min)
    }

    pub fn max(name: &'static str, value: fn(&T) -> Option<f64>) -> Self {
        Self::numeric(name, value, Reducer::Max)
    }

    /// Rows that carry a value for `value`.
    pub fn count_values(name: &'static str, value: fn(&T) -> Option<f64>) -> Self {
        Self::numeric(name, value, Reducer::Count)
    }

    /// Every row in the bucket.
    pub fn count(name: &'static str) -> Self {
        Self {
            name,
            source: Source::Rows,
            reducer: Reducer::Count,
        }
    }

    pub fn distinct(name: &'static str, key: fn(&T) -> Option<String>) -> Self {
        Self {
            name,
            source: Source::Key(key),
            reducer: Reducer::CountDistinct,
        }
    }

    pub fn reducer(&self) -> Reducer {
        self.reducer
    }
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: usize,
    min: Option<f64>,
    max: Option<f64>,
    distinct: HashSet<String>,
}

impl Accumulator {
    fn push<T>(&mut self, source: &Source<T>, row: &T) {
        match source {
            Source::Rows => self.count += 1,
            Source::Number(f) => {
                if let Some(v) = f(row).filter(|v| v.is_finite()) {
                    self.sum += v;
                    self.count += 1;
                    self.min = Some(self.min.map_or(v, |m| m.min(v)));
                    self.max = Some(self.max.map_or(v, |m| m.max(v)));
                }
            }
            Source::Key(f) => {
                if let Some(k) = f(row) {
                    self.distinct.insert(k);
                }
            }
        }
    }

    fn finish(&self, reducer: Reducer) -> f64 {
        match reducer {
            Reducer::Sum => self.sum,
            Reducer::Count => self.count as f64,
            Reducer::Average if self.count == 0 => 0.0,
            Reducer::Average => self.sum / self.count as f64,
            Reducer::Min => self.min.unwrap_or(0.0),
            Reducer::Max => self.max.unwrap_or(0.0),
            Reducer::CountDistinct => self.distinct.len() as f64,
        }
    }
}

/// A finalized group: key, row count and one value per measure.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRecord<K> {
    pub key: K,
    pub rows: usize,
    values: Vec<(&'static str, f64)>,
}

impl<K> GroupRecord<K> {
    /// Final value of a measure; `0` for unknown names.
    pub fn get(&self, measure: &str) -> f64 {
        self.values
            .iter()
            .find(|(n, _)| *n == measure)
            .map_or(0.0, |(_, v)| *v)
    }
}

/// All groups of one grouping pass, in first-encounter order.
#[derive(Debug, Clone, PartialEq)]
pub struct Grouped<K> {
    pub groups: Vec<GroupRecord<K>>,
    /// Rows that produced no group key.
    pub excluded: usize,
}

impl<K> Default for Grouped<K> {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            excluded: 0,
        }
    }
}

impl<K> Grouped<K> {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Sum of a measure across all groups of this pass.
    pub fn grand_total(&self, measure: &str) -> f64 {
        self.groups.iter().map(|g| g.get(measure)).sum()
    }

    /// A group's share of the grand total, in percent. `0` when the total is `0`.
    pub fn share(&self, group: &GroupRecord<K>, measure: &str) -> f64 {
        crate::stats::percentage(group.get(measure), self.grand_total(measure))
    }

    pub fn find(&self, key: &K) -> Option<&GroupRecord<K>>
    where
        K: PartialEq,
    {
        self.groups.iter().find(|g| &g.key == key)
    }
}

/// Group `rows` by `key` and reduce each group with `measures`.
pub fn group_by<'a, T: 'a, K, F>(
    rows: impl IntoIterator<Item = &'a T>,
    key: F,
    measures: &[Measure<T>],
) -> Grouped<K>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> Option<K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut buckets: Vec<(K, usize, Vec<Accumulator>)> = Vec::new();
    let mut excluded = 0;

    for row in rows {
        let Some(k) = key(row) else {
            excluded += 1;
            continue;
        };
        let slot = *index.entry(k.clone()).or_insert_with(|| {
            buckets.push((k, 0, measures.iter().map(|_| Accumulator::default()).collect()));
            buckets.len() - 1
        });
        let (_, count, accs) = &mut buckets[slot];
        *count += 1;
        for (acc, m) in accs.iter_mut().zip(measures) {
            acc.push(&m.source, row);
        }
    }

    let groups = buckets
        .into_iter()
        .map(|(key, rows, accs)| GroupRecord {
            key,
            rows,
            values: measures
                .iter()
                .zip(&accs)
                .map(|(m, acc)| (m.name, acc.finish(m.reducer)))
                .collect(),
        })
        .collect();

    Grouped { groups, excluded }
}
