//! Capacity Dashboard
//! Planned and used machine hours per order date, with the average OEE of the orders.

use crate::calendar::DateFormat;
use crate::charts::{shape, SeriesOrder};
use crate::data::{FieldSpec, NormalizedRecord, NumberPolicy, Schema};
use crate::filter::{FieldOptions, FilterChain, FilterField, FilterSpec, Selection};
use crate::pipeline::{Dashboard, TypedRow};
use crate::stats::{average, group_by, total, Measure};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct CapacityRow {
    pub order_date: NaiveDate,
    pub bucketing: Option<String>,
    pub machine: Option<String>,
    /// Blank cells read as `0`, so they pull the average down.
    pub oee: f64,
    pub planned: f64,
    pub used: f64,
    pub left: f64,
}

fn hours(name: &'static str, columns: &'static [&'static str]) -> FieldSpec {
    FieldSpec::number(name, columns, NumberPolicy::ZeroIfInvalid)
}

impl TypedRow for CapacityRow {
    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::date("order_date", &["Order Date"], DateFormat::Auto).required(),
            FieldSpec::text("bucketing", &["Bucketing"]),
            FieldSpec::text("machine", &["Machine"]),
            hours("oee", &["Average OEE (%)"]),
            hours("planned", &["Planned Capacity (hrs)"]),
            hours("used", &["Used Capacity (hrs)"]),
            hours("left", &["Capacity Left (hrs)"]),
        ])
    }

    fn from_record(record: &NormalizedRecord) -> Option<Self> {
        let n = |field: &str| record.number(field).unwrap_or(0.0);
        Some(Self {
            order_date: record.date("order_date")?,
            bucketing: record.text("bucketing").map(str::to_string),
            machine: record.text("machine").map(str::to_string),
            oee: n("oee"),
            planned: n("planned"),
            used: n("used"),
            left: n("left"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityFilters {
    /// Inclusive order-date window; either bound may be left open.
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub bucketing: Option<String>,
}

impl CapacityFilters {
    fn spec(&self) -> FilterSpec {
        FilterSpec::new()
            .with("order_date", Selection::range(self.start, self.end))
            .with("bucketing", Selection::single(self.bucketing.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCapacity {
    /// `"YYYY-MM-DD"`
    pub date: String,
    pub used: f64,
    pub left: f64,
    pub average_oee: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityReport {
    pub average_oee: f64,
    pub total_planned: f64,
    pub total_used: f64,
    pub total_left: f64,
    pub daily: Vec<DailyCapacity>,
    /// Machines with orders in the window, sorted.
    pub machines: Vec<String>,
    pub options: Vec<FieldOptions>,
    pub applied: FilterSpec,
}

pub struct Capacity;

fn chain() -> FilterChain<CapacityRow> {
    FilterChain::new(vec![
        FilterField::date("order_date", |r: &CapacityRow| Some(r.order_date)),
        FilterField::text("bucketing", |r: &CapacityRow| r.bucketing.clone()).sorted(),
    ])
}

impl Dashboard for Capacity {
    const NAME: &'static str = "capacity";
    type Row = CapacityRow;
    type Filters = CapacityFilters;
    type Output = CapacityReport;

    fn compute(rows: &[CapacityRow], filters: &CapacityFilters) -> CapacityReport {
        let view = chain().apply(rows, &filters.spec());

        let by_date = group_by(
            view.iter(),
            |r| Some(r.order_date),
            &[
                Measure::sum("used", |r: &CapacityRow| Some(r.used)),
                Measure::sum("left", |r: &CapacityRow| Some(r.left)),
                Measure::average("oee", |r: &CapacityRow| Some(r.oee)),
            ],
        );
        let daily = shape(&by_date, SeriesOrder::KeyAsc, None, |g| DailyCapacity {
            date: g.key.format("%Y-%m-%d").to_string(),
            used: g.get("used"),
            left: g.get("left"),
            average_oee: g.get("oee"),
        });

        let by_machine = group_by(view.iter(), |r| r.machine.clone(), &[Measure::count("orders")]);
        let machines = shape(&by_machine, SeriesOrder::KeyAsc, None, |g| g.key.clone());

        CapacityReport {
            average_oee: average(view.iter(), |r| Some(r.oee)),
            total_planned: total(view.iter(), |r| Some(r.planned)),
            total_used: total(view.iter(), |r| Some(r.used)),
            total_left: total(view.iter(), |r| Some(r.left)),
            daily,
            machines,
            options: view.options.clone(),
            applied: view.resolved.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawRecord;
    use crate::pipeline::Dataset;

    fn raw(
        date: &str,
        bucket: &str,
        machine: &str,
        oee: &str,
        planned: &str,
        used: &str,
        left: &str,
    ) -> RawRecord {
        RawRecord::new()
            .with("Order Date", date)
            .with("Bucketing", bucket)
            .with("Machine", machine)
            .with("Average OEE (%)", oee)
            .with("Planned Capacity (hrs)", planned)
            .with("Used Capacity (hrs)", used)
            .with("Capacity Left (hrs)", left)
    }

    fn dataset() -> Dataset<CapacityRow> {
        Dataset::from_raw(&[
            raw("2024-03-02", "A", "IMM-2", "80", "10", "8", "2"),
            raw("2024-03-01", "A", "IMM-1", "60", "10", "6", "4"),
            raw("2024-03-02", "B", "IMM-1", "", "5", "5", "0"),
            raw("2024-03-04", "B", "IMM-3", "90", "8", "4", "4"),
        ])
    }

    #[test]
    fn cards_cover_the_whole_view() {
        let data = dataset();
        let report = Capacity::compute(data.rows(), &CapacityFilters::default());
        // the blank OEE counts as zero
        assert_eq!(report.average_oee, 57.5);
        assert_eq!(report.total_planned, 33.0);
        assert_eq!(report.total_used, 23.0);
        assert_eq!(report.total_left, 10.0);
        assert_eq!(report.machines, vec!["IMM-1", "IMM-2", "IMM-3"]);
    }

    #[test]
    fn used_and_left_hours_per_order_date() {
        let data = dataset();
        let report = Capacity::compute(data.rows(), &CapacityFilters::default());
        let dates: Vec<&str> = report.daily.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-03-02", "2024-03-04"]);

        let second = &report.daily[1];
        assert_eq!(second.used, 13.0);
        assert_eq!(second.left, 2.0);
        assert_eq!(second.average_oee, 40.0);
    }

    #[test]
    fn date_window_and_bucketing() {
        let data = dataset();
        let f = CapacityFilters {
            start: NaiveDate::from_ymd_opt(2024, 3, 2),
            end: NaiveDate::from_ymd_opt(2024, 3, 3),
            bucketing: Some("B".into()),
        };
        let report = Capacity::compute(data.rows(), &f);
        assert_eq!(report.daily.len(), 1);
        assert_eq!(report.total_planned, 5.0);
        assert_eq!(report.machines, vec!["IMM-1"]);
    }

    #[test]
    fn empty_window() {
        let data = dataset();
        let f = CapacityFilters {
            start: NaiveDate::from_ymd_opt(2025, 1, 1),
            ..Default::default()
        };
        let report = Capacity::compute(data.rows(), &f);
        assert!(report.daily.is_empty());
        assert_eq!(report.average_oee, 0.0);
        assert_eq!(report.total_planned, 0.0);
    }
}
