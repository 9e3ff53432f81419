//! Downtime Dashboard
//! Machine downtime per month.

use crate::calendar::{month_label_cmp, DateFormat, YearMonth};
use crate::charts::{shape, SeriesOrder};
use crate::data::{FieldSpec, NormalizedRecord, NumberPolicy, Schema};
use crate::filter::{FieldOptions, FilterChain, FilterField, FilterSpec, Selection};
use crate::pipeline::{Dashboard, TypedRow};
use crate::stats::{group_by, total, Measure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct DowntimeRow {
    pub period: YearMonth,
    pub device: Option<String>,
    pub downtime: f64,
}

impl TypedRow for DowntimeRow {
    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::date("date", &["Dates", "Date"], DateFormat::DayMonthYear).required(),
            FieldSpec::text("device", &["Device"]),
            FieldSpec::number("downtime", &["Final downtime"], NumberPolicy::ZeroIfInvalid),
        ])
    }

    fn from_record(record: &NormalizedRecord) -> Option<Self> {
        Some(Self {
            period: YearMonth::of(record.date("date")?),
            device: record.text("device").map(str::to_string),
            downtime: record.number("downtime").unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DowntimeFilters {
    /// `"March 2024"`
    pub month: Option<String>,
    pub device: Option<String>,
}

impl DowntimeFilters {
    fn spec(&self) -> FilterSpec {
        FilterSpec::new()
            .with("month", Selection::single(self.month.as_deref()))
            .with("device", Selection::single(self.device.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyDowntime {
    /// `"Mar 2024"`
    pub month: String,
    pub downtime: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DowntimeReport {
    pub total_downtime: f64,
    pub monthly: Vec<MonthlyDowntime>,
    pub options: Vec<FieldOptions>,
    pub applied: FilterSpec,
}

pub struct Downtime;

fn chain() -> FilterChain<DowntimeRow> {
    FilterChain::new(vec![
        FilterField::text("month", |r: &DowntimeRow| Some(r.period.long_label())).ordered_by(month_label_cmp),
        FilterField::text("device", |r: &DowntimeRow| r.device.clone()).sorted(),
    ])
}

impl Dashboard for Downtime {
    const NAME: &'static str = "downtime";
    type Row = DowntimeRow;
    type Filters = DowntimeFilters;
    type Output = DowntimeReport;

    fn compute(rows: &[DowntimeRow], filters: &DowntimeFilters) -> DowntimeReport {
        let view = chain().apply(rows, &filters.spec());

        let by_month = group_by(
            view.iter(),
            |r| Some(r.period),
            &[Measure::sum("downtime", |r: &DowntimeRow| Some(r.downtime))],
        );

        DowntimeReport {
            total_downtime: total(view.iter(), |r| Some(r.downtime)),
            monthly: shape(&by_month, SeriesOrder::KeyAsc, None, |g| MonthlyDowntime {
                month: g.key.short_label(),
                downtime: g.get("downtime"),
            }),
            options: view.options.clone(),
            applied: view.resolved.clone(),
        }
    }
}
