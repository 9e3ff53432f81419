//! Metric Summary
//! Scalar KPIs derived from a filtered row set, with explicit zero guards.

use serde::Serialize;
use statrs::statistics::Statistics;

/// Sum of `value` over `rows`; rows without a value contribute nothing.
pub fn total<'a, T: 'a>(rows: impl IntoIterator<Item = &'a T>, value: fn(&T) -> Option<f64>) -> f64 {
    rows.into_iter().filter_map(value).sum()
}

/// Mean of the rows that carry a value; `0` when none do.
pub fn average<'a, T: 'a>(rows: impl IntoIterator<Item = &'a T>, value: fn(&T) -> Option<f64>) -> f64 {
    let values: Vec<f64> = rows.into_iter().filter_map(value).collect();
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

/// `numerator / denominator`, or `0` when the denominator is `0`.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// `part / whole × 100`, or `0` when `whole` is `0`.
pub fn percentage(part: f64, whole: f64) -> f64 {
    ratio(part, whole) * 100.0
}

/// Growth of `current` over `previous` in percent; `0` when `previous` is `0`.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Last positive value of the primary field.
    Latest,
    /// First positive value of the fallback field.
    Fallback,
    /// Neither field had a positive value.
    Missing,
}

/// A "current" reading picked from a chronological series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurrentValue {
    pub value: f64,
    pub source: ValueSource,
}

/// Pick the current value of a chronologically sorted series.
///
/// Takes the last entry whose `primary` value is present and positive. Failing that,
/// the first entry whose `fallback` value is present and positive. Failing both, `0`.
pub fn current_value<E>(
    series: &[E],
    primary: fn(&E) -> Option<f64>,
    fallback: fn(&E) -> Option<f64>,
) -> CurrentValue {
    if let Some(v) = series.iter().rev().filter_map(primary).find(|v| *v > 0.0) {
        return CurrentValue {
            value: v,
            source: ValueSource::Latest,
        };
    }
    if let Some(v) = series.iter().filter_map(fallback).find(|v| *v > 0.0) {
        return CurrentValue {
            value: v,
            source: ValueSource::Fallback,
        };
    }
    CurrentValue {
        value: 0.0,
        source: ValueSource::Missing,
    }
}
