//! Cascading filter chain.
//!
//! Filters run in their declared order. The option list offered for filter `k` is
//! computed from the rows that survive filters `1..k-1`, and a selection that upstream
//! filters have made impossible is reset to `All` before it is applied.

use super::selection::{iso_day, Selection};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// How a filter field reads its key from a row.
pub enum FieldKey<T> {
    Text(fn(&T) -> Option<String>),
    Date(fn(&T) -> Option<NaiveDate>),
}

/// Order of the option list offered for a field.
#[derive(Clone, Copy)]
pub enum OptionOrder {
    /// First-seen order in the surviving rows.
    Encounter,
    Ascending,
    Custom(fn(&str, &str) -> Ordering),
}

/// Orders integer labels ("2", "10") numerically, anything else lexically.
pub fn numeric_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

pub struct FilterField<T> {
    pub name: &'static str,
    key: FieldKey<T>,
    order: OptionOrder,
}

impl<T> FilterField<T> {
    pub fn text(name: &'static str, key: fn(&T) -> Option<String>) -> Self {
        Self {
            name,
            key: FieldKey::Text(key),
            order: OptionOrder::Encounter,
        }
    }

    pub fn date(name: &'static str, key: fn(&T) -> Option<NaiveDate>) -> Self {
        Self {
            name,
            key: FieldKey::Date(key),
            order: OptionOrder::Ascending,
        }
    }

    pub fn sorted(mut self) -> Self {
        self.order = OptionOrder::Ascending;
        self
    }

    pub fn ordered_by(mut self, cmp: fn(&str, &str) -> Ordering) -> Self {
        self.order = OptionOrder::Custom(cmp);
        self
    }

    fn text_key(&self, row: &T) -> Option<String> {
        match &self.key {
            FieldKey::Text(f) => f(row),
            FieldKey::Date(f) => f(row).map(iso_day),
        }
    }

    fn matches(&self, selection: &Selection, row: &T) -> bool {
        match &self.key {
            FieldKey::Text(f) => selection.matches_text(f(row).as_deref()),
            FieldKey::Date(f) => selection.matches_date(f(row)),
        }
    }

    /// Distinct keys of `rows`, in this field's option order.
    fn options<'a>(&self, rows: impl Iterator<Item = &'a T>) -> Vec<String>
    where
        T: 'a,
    {
        let mut seen = HashSet::new();
        let mut values: Vec<String> = rows
            .filter_map(|r| self.text_key(r))
            .filter(|k| seen.insert(k.clone()))
            .collect();
        match self.order {
            OptionOrder::Encounter => {}
            OptionOrder::Ascending => values.sort(),
            OptionOrder::Custom(cmp) => values.sort_by(|a, b| cmp(a, b)),
        }
        values
    }

    /// Drop the parts of `selection` that upstream filters made impossible.
    ///
    /// A value absent from `options` but present somewhere in `all_rows` is stale.
    /// A value absent from the whole dataset is kept and simply matches nothing.
    fn resolve(&self, selection: Selection, options: &[String], all_rows: &[T]) -> Selection {
        let offered = |v: &str| options.iter().any(|o| o == v);
        let exists = |v: &str| all_rows.iter().any(|r| self.text_key(r).as_deref() == Some(v));

        match selection {
            Selection::One(v) if !offered(&v) && exists(&v) => {
                debug!(field = self.name, value = %v, "stale selection reset to All");
                Selection::All
            }
            Selection::Many(values) => {
                let before = values.len();
                let kept: Vec<String> = values
                    .into_iter()
                    .filter(|v| offered(v) || !exists(v))
                    .collect();
                if kept.len() < before {
                    debug!(field = self.name, dropped = before - kept.len(), "stale selections dropped");
                }
                if kept.is_empty() {
                    Selection::All
                } else {
                    Selection::Many(kept)
                }
            }
            Selection::Range { .. } if matches!(self.key, FieldKey::Text(_)) => {
                debug!(field = self.name, "date range on a text field ignored");
                Selection::All
            }
            other => other,
        }
    }
}

/// Ordered (field, selection) pairs. Fields not listed are unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterSpec {
    selections: Vec<(String, Selection)>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, selection: Selection) -> Self {
        self.set(field, selection);
        self
    }

    pub fn set(&mut self, field: &str, selection: Selection) {
        match self.selections.iter_mut().find(|(f, _)| f == field) {
            Some((_, s)) => *s = selection,
            None => self.selections.push((field.to_string(), selection)),
        }
    }

    pub fn get(&self, field: &str) -> &Selection {
        static ALL: Selection = Selection::All;
        self.selections
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, s)| s)
            .unwrap_or(&ALL)
    }
}

/// Option list offered for one field after cascading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOptions {
    pub field: &'static str,
    pub values: Vec<String>,
}

/// Result of running a filter chain.
#[derive(Debug)]
pub struct FilterOutcome<'a, T> {
    pub rows: Vec<&'a T>,
    pub options: Vec<FieldOptions>,
    /// Selections actually applied, after stale resets.
    pub resolved: FilterSpec,
    /// Surviving row count after each filter, in chain order.
    pub stage_counts: Vec<usize>,
}

impl<'a, T> FilterOutcome<'a, T> {
    /// Surviving rows, in input order.
    pub fn iter(&self) -> impl Iterator<Item = &'a T> + '_ {
        self.rows.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn options_for(&self, field: &str) -> &[String] {
        self.options
            .iter()
            .find(|o| o.field == field)
            .map(|o| o.values.as_slice())
            .unwrap_or(&[])
    }
}

/// An ordered set of filter fields for one dashboard.
pub struct FilterChain<T> {
    fields: Vec<FilterField<T>>,
}

impl<T> FilterChain<T> {
    pub fn new(fields: Vec<FilterField<T>>) -> Self {
        Self { fields }
    }

    pub fn apply<'a>(&self, rows: &'a [T], spec: &FilterSpec) -> FilterOutcome<'a, T> {
        let mut current: Vec<&'a T> = rows.iter().collect();
        let mut options = Vec::with_capacity(self.fields.len());
        let mut resolved = FilterSpec::new();
        let mut stage_counts = Vec::with_capacity(self.fields.len());

        for field in &self.fields {
            let offered = field.options(current.iter().copied());
            let selection = field.resolve(spec.get(field.name).clone(), &offered, rows);

            current.retain(|r| field.matches(&selection, r));
            stage_counts.push(current.len());
            resolved.set(field.name, selection);
            options.push(FieldOptions {
                field: field.name,
                values: offered,
            });
        }

        FilterOutcome {
            rows: current,
            options,
            resolved,
            stage_counts,
        }
    }
}
