//! Row Normalizer
//! Coerces raw CSV rows into typed records according to a per-dashboard schema.

use crate::calendar::DateFormat;
use crate::data::record::{NormalizedRecord, RawRecord, Value};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// What to do with a numeric cell that is blank or unparseable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberPolicy {
    /// Treat as `0`. For quantities that are only ever summed (sales, consumption).
    ZeroIfInvalid,
    /// Leave the field absent so averages and filters skip it.
    Exclude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number(NumberPolicy),
    Date(DateFormat),
}

/// One typed field of a dashboard schema.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Candidate CSV columns; the first non-blank one wins.
    pub columns: &'static [&'static str],
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn text(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            name,
            columns,
            kind: FieldKind::Text,
            required: false,
        }
    }

    pub fn number(name: &'static str, columns: &'static [&'static str], policy: NumberPolicy) -> Self {
        Self {
            name,
            columns,
            kind: FieldKind::Number(policy),
            required: false,
        }
    }

    pub fn date(name: &'static str, columns: &'static [&'static str], format: DateFormat) -> Self {
        Self {
            name,
            columns,
            kind: FieldKind::Date(format),
            required: false,
        }
    }

    /// Rows where this field is missing or fails coercion are dropped.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn coerce(&self, raw: &RawRecord) -> Result<Option<Value>, Exclusion> {
        let cell = self.columns.iter().find_map(|c| raw.get(c));

        let Some(cell) = cell else {
            if self.required {
                return Err(Exclusion::new(self.name, ExclusionReason::MissingField));
            }
            return Ok(match self.kind {
                FieldKind::Number(NumberPolicy::ZeroIfInvalid) => Some(Value::Number(0.0)),
                _ => None,
            });
        };

        let value = match self.kind {
            FieldKind::Text => Some(Value::Text(cell.to_string())),
            FieldKind::Number(policy) => match (parse_number(cell), policy) {
                (Some(n), _) => Some(Value::Number(n)),
                (None, NumberPolicy::ZeroIfInvalid) if !self.required => Some(Value::Number(0.0)),
                (None, _) => None,
            },
            FieldKind::Date(format) => format.parse(cell).map(Value::Date),
        };

        match value {
            None if self.required => Err(Exclusion::new(self.name, ExclusionReason::InvalidField)),
            v => Ok(v),
        }
    }
}

/// Parse a decimal cell. Tolerates thousands separators and a trailing `%`;
/// rejects anything that is not a finite number.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let n: f64 = cleaned.trim().parse().ok()?;
    n.is_finite().then_some(n)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    MissingField,
    InvalidField,
    /// Coerced cleanly but the dashboard's row type could not be built from it.
    RowType,
}

/// Why a single row was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exclusion {
    pub field: &'static str,
    pub reason: ExclusionReason,
}

impl Exclusion {
    fn new(field: &'static str, reason: ExclusionReason) -> Self {
        Self { field, reason }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusionCount {
    pub field: &'static str,
    pub reason: ExclusionReason,
    pub rows: usize,
}

/// Diagnostic summary of a normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub total: usize,
    pub kept: usize,
    pub excluded: Vec<ExclusionCount>,
}

impl NormalizeReport {
    pub fn excluded_rows(&self) -> usize {
        self.total - self.kept
    }

    /// Move `rows` kept records to the excluded side under `RowType`.
    pub fn reject_rows(&mut self, rows: usize) {
        let rows = rows.min(self.kept);
        if rows == 0 {
            return;
        }
        self.kept -= rows;
        match self
            .excluded
            .iter_mut()
            .find(|e| e.reason == ExclusionReason::RowType)
        {
            Some(e) => e.rows += rows,
            None => self.excluded.push(ExclusionCount {
                field: "row",
                reason: ExclusionReason::RowType,
                rows,
            }),
        }
    }
}

/// Result of normalizing a batch of raw rows.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<NormalizedRecord>,
    pub report: NormalizeReport,
}

/// Field layout of one dashboard's CSV extract.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Primary column names of the required fields.
    pub fn required_columns(&self) -> Vec<&'static str> {
        self.columns_where(|f| f.required)
    }

    pub fn optional_columns(&self) -> Vec<&'static str> {
        self.columns_where(|f| !f.required)
    }

    fn columns_where(&self, pred: impl Fn(&FieldSpec) -> bool) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| pred(f))
            .filter_map(|f| f.columns.first().copied())
            .collect()
    }

    /// Coerce one row, or report the first field that disqualifies it.
    pub fn coerce(&self, raw: &RawRecord) -> Result<NormalizedRecord, Exclusion> {
        let mut record = NormalizedRecord::default();
        for field in &self.fields {
            if let Some(value) = field.coerce(raw)? {
                record.set(field.name, value);
            }
        }
        Ok(record)
    }

    /// Normalize a batch. Output keeps input order and never exceeds input length.
    pub fn normalize(&self, raw: &[RawRecord]) -> Normalized {
        let coerced: Vec<Result<NormalizedRecord, Exclusion>> =
            raw.par_iter().map(|r| self.coerce(r)).collect();

        let mut records = Vec::with_capacity(coerced.len());
        let mut excluded: BTreeMap<(&'static str, ExclusionReason), usize> = BTreeMap::new();
        for result in coerced {
            match result {
                Ok(record) => records.push(record),
                Err(e) => *excluded.entry((e.field, e.reason)).or_default() += 1,
            }
        }

        let report = NormalizeReport {
            total: raw.len(),
            kept: records.len(),
            excluded: excluded
                .into_iter()
                .map(|((field, reason), rows)| ExclusionCount { field, reason, rows })
                .collect(),
        };

        for e in &report.excluded {
            debug!(field = e.field, reason = ?e.reason, rows = e.rows, "excluded rows");
        }
        if report.total > 0 && report.kept == 0 {
            warn!(
                total = report.total,
                required = ?self.required_columns(),
                "every row was excluded during normalization"
            );
        }

        Normalized { records, report }
    }
}
