//! Raw Material PO Status Dashboard
//! Purchase order counts, lead times, delivery performance and raw material consumption.

use crate::calendar::{month_name, DateFormat};
use crate::charts::{shape, SeriesOrder};
use crate::data::{FieldSpec, NormalizedRecord, NumberPolicy, Schema};
use crate::filter::{numeric_cmp, FieldOptions, FilterChain, FilterField, FilterSpec, Selection};
use crate::pipeline::{Dashboard, TypedRow};
use crate::stats::{average, group_by, percentage, total, Descriptive, Measure};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Statuses shown first, in this order. Any other status follows in encounter order.
const STATUS_ORDER: [&str; 3] = ["Open", "Closed", "Delayed"];

#[derive(Debug, Clone, PartialEq)]
pub struct PoRow {
    pub date: NaiveDate,
    pub raw_material: Option<String>,
    pub vendor: Option<String>,
    pub po_number: Option<String>,
    pub status: Option<String>,
    pub lead_time_days: Option<f64>,
    pub expected_delivery: Option<NaiveDate>,
    pub actual_delivery: Option<NaiveDate>,
    /// From the extract when present, else actual minus expected.
    pub delay_days: Option<i64>,
    pub daily_consumption: Option<f64>,
    pub total_cost: Option<f64>,
    pub item_description: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

impl PoRow {
    /// `Some(true)` when the delivery came after the expected date; `None` when
    /// either date is missing.
    pub fn delayed(&self) -> Option<bool> {
        Some(self.expected_delivery? < self.actual_delivery?)
    }
}

impl TypedRow for PoRow {
    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::date("date", &["Date", "PO Date"], DateFormat::Auto).required(),
            FieldSpec::text("raw_material", &["Raw Material"]),
            FieldSpec::text("vendor", &["Vendor Name", "Vendor"]),
            FieldSpec::text("po_number", &["PO Number", "PO"]),
            FieldSpec::text("status", &["PO Status"]),
            FieldSpec::number("lead_time", &["Lead Time (Days)"], NumberPolicy::Exclude),
            FieldSpec::date("expected", &["Expected Delivery Date"], DateFormat::Auto),
            FieldSpec::date("actual", &["Actual Delivery Date"], DateFormat::Auto),
            FieldSpec::number("delay", &["Delivery Delay (Days)"], NumberPolicy::Exclude),
            FieldSpec::number("daily_consumption", &["Daily Consumption"], NumberPolicy::Exclude),
            FieldSpec::number("total_cost", &["Total Cost"], NumberPolicy::Exclude),
            FieldSpec::text("item_description", &["Item Description"]),
            FieldSpec::number("quantity", &["Quantity Ordered"], NumberPolicy::Exclude),
            FieldSpec::text("unit", &["Unit"]),
        ])
    }

    fn from_record(record: &NormalizedRecord) -> Option<Self> {
        let owned = |field: &str| record.text(field).map(str::to_string);
        let expected = record.date("expected");
        let actual = record.date("actual");
        let delay_days = record.number("delay").map(|d| d.round() as i64).or_else(|| {
            Some(actual?.signed_duration_since(expected?).num_days())
        });
        Some(Self {
            date: record.date("date")?,
            raw_material: owned("raw_material"),
            vendor: owned("vendor"),
            po_number: owned("po_number"),
            status: owned("status"),
            lead_time_days: record.number("lead_time"),
            expected_delivery: expected,
            actual_delivery: actual,
            delay_days,
            daily_consumption: record.number("daily_consumption"),
            total_cost: record.number("total_cost"),
            item_description: owned("item_description"),
            quantity: record.number("quantity"),
            unit: owned("unit"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoFilters {
    pub raw_material: Option<String>,
    pub vendor: Option<String>,
    pub year: Option<String>,
    /// Month number, `"1"`..`"12"`.
    pub month: Option<String>,
    pub day: Option<String>,
    /// Status whose purchase orders are listed in the detail table.
    pub status: Option<String>,
}

impl PoFilters {
    fn spec(&self) -> FilterSpec {
        FilterSpec::new()
            .with("raw_material", Selection::single(self.raw_material.as_deref()))
            .with("vendor", Selection::single(self.vendor.as_deref()))
            .with("year", Selection::single(self.year.as_deref()))
            .with("month", Selection::single(self.month.as_deref()))
            .with("day", Selection::single(self.day.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeliveryPerformance {
    pub on_time: usize,
    pub delayed: usize,
    /// Rows missing an expected or actual delivery date.
    pub undated: usize,
    pub on_time_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConsumptionStats {
    pub total: f64,
    pub average: f64,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialAverage {
    pub raw_material: String,
    pub average: f64,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyConsumption {
    pub month: String,
    pub materials: Vec<MaterialAverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoDetail {
    pub po_number: Option<String>,
    pub date: NaiveDate,
    pub vendor: Option<String>,
    pub item_description: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub total_cost: Option<f64>,
    pub expected_delivery: Option<NaiveDate>,
    pub actual_delivery: Option<NaiveDate>,
    pub delay_days: i64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoReport {
    pub total_pos: usize,
    pub average_lead_time: f64,
    pub lead_time: Descriptive,
    pub status_breakdown: Vec<StatusCount>,
    pub delivery: DeliveryPerformance,
    pub consumption: ConsumptionStats,
    pub monthly_consumption: Vec<MonthlyConsumption>,
    pub status_details: Vec<PoDetail>,
    pub summary: String,
    pub options: Vec<FieldOptions>,
    pub applied: FilterSpec,
}

pub struct PoStatus;

fn chain() -> FilterChain<PoRow> {
    FilterChain::new(vec![
        FilterField::text("raw_material", |r: &PoRow| r.raw_material.clone()).sorted(),
        FilterField::text("vendor", |r: &PoRow| r.vendor.clone()).sorted(),
        FilterField::text("year", |r: &PoRow| Some(r.date.year().to_string())).ordered_by(numeric_cmp),
        FilterField::text("month", |r: &PoRow| Some(r.date.month().to_string())).ordered_by(numeric_cmp),
        FilterField::text("day", |r: &PoRow| Some(r.date.day().to_string())).ordered_by(numeric_cmp),
    ])
}

fn status_rank(status: &str) -> usize {
    STATUS_ORDER
        .iter()
        .position(|s| *s == status)
        .unwrap_or(STATUS_ORDER.len())
}

fn by_status_rank(a: &String, b: &String) -> Ordering {
    status_rank(a).cmp(&status_rank(b))
}

/// Distinct PO numbers among rows with a status; rows without a number count once each.
fn count_pos<'a>(rows: impl Iterator<Item = &'a PoRow>) -> usize {
    let mut numbered = HashSet::new();
    let mut unnumbered = 0;
    for row in rows.filter(|r| r.status.is_some()) {
        match row.po_number.as_deref() {
            Some(n) => {
                numbered.insert(n);
            }
            None => unnumbered += 1,
        }
    }
    numbered.len() + unnumbered
}

fn delivery_performance<'a>(rows: impl Iterator<Item = &'a PoRow>) -> DeliveryPerformance {
    let (mut on_time, mut delayed, mut undated) = (0, 0, 0);
    for row in rows {
        match row.delayed() {
            Some(true) => delayed += 1,
            Some(false) => on_time += 1,
            None => undated += 1,
        }
    }
    DeliveryPerformance {
        on_time,
        delayed,
        undated,
        on_time_rate: percentage(on_time as f64, (on_time + delayed) as f64),
    }
}

/// Readable description of the applied filters.
fn filter_summary(applied: &FilterSpec) -> String {
    let labels = [
        ("raw_material", "Raw Material"),
        ("vendor", "Vendor"),
        ("year", "Year"),
        ("month", "Month"),
        ("day", "Day"),
    ];
    let parts: Vec<String> = labels
        .iter()
        .filter_map(|(field, label)| match applied.get(field) {
            Selection::One(v) if *field == "month" => {
                let name = v.parse().ok().and_then(month_name).unwrap_or(v.as_str());
                Some(format!("{label}: {name}"))
            }
            Selection::One(v) => Some(format!("{label}: {v}")),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        "Showing all inventory data".to_string()
    } else {
        format!("Filtered by: {}", parts.join(", "))
    }
}

impl Dashboard for PoStatus {
    const NAME: &'static str = "po_status";
    type Row = PoRow;
    type Filters = PoFilters;
    type Output = PoReport;

    fn compute(rows: &[PoRow], filters: &PoFilters) -> PoReport {
        let view = chain().apply(rows, &filters.spec());

        let lead_times: Vec<f64> = view.iter().filter_map(|r| r.lead_time_days).collect();

        let by_status = group_by(view.iter(), |r| r.status.clone(), &[Measure::count("count")]);
        let status_breakdown = shape(&by_status, SeriesOrder::ByKey(by_status_rank), None, |g| {
            StatusCount {
                status: g.key.clone(),
                count: g.rows,
                percentage: by_status.share(g, "count"),
            }
        });

        let consumption = ConsumptionStats {
            total: total(view.iter(), |r| r.daily_consumption),
            average: average(view.iter(), |r| r.daily_consumption),
            records: view.iter().filter(|r| r.daily_consumption.is_some()).count(),
        };

        let status_details = match filters.status.as_deref() {
            Some(status) => view
                .iter()
                .filter(|r| r.status.as_deref() == Some(status))
                .map(|r| PoDetail {
                    po_number: r.po_number.clone(),
                    date: r.date,
                    vendor: r.vendor.clone(),
                    item_description: r.item_description.clone(),
                    quantity: r.quantity,
                    unit: r.unit.clone(),
                    total_cost: r.total_cost,
                    expected_delivery: r.expected_delivery,
                    actual_delivery: r.actual_delivery,
                    delay_days: r.delay_days.unwrap_or(0),
                    status: status.to_string(),
                })
                .collect(),
            None => Vec::new(),
        };

        PoReport {
            total_pos: count_pos(view.iter()),
            average_lead_time: average(view.iter(), |r| r.lead_time_days),
            lead_time: Descriptive::of(&lead_times),
            status_breakdown,
            delivery: delivery_performance(view.iter()),
            consumption,
            monthly_consumption: monthly_consumption(&view.rows),
            status_details,
            summary: filter_summary(&view.resolved),
            options: view.options.clone(),
            applied: view.resolved.clone(),
        }
    }
}

/// Average daily consumption per raw material, per calendar month (January first).
/// Every month lists every raw material of the view, with `0` where it has no readings.
fn monthly_consumption(rows: &[&PoRow]) -> Vec<MonthlyConsumption> {
    let mut materials: Vec<String> = rows.iter().filter_map(|r| r.raw_material.clone()).collect();
    materials.sort();
    materials.dedup();

    let grouped = group_by(
        rows.iter().copied(),
        |r| Some((r.date.month(), r.raw_material.clone()?)),
        &[
            Measure::average("average", |r: &PoRow| r.daily_consumption),
            Measure::count_values("records", |r: &PoRow| r.daily_consumption),
        ],
    );
    let mut months: Vec<u32> = grouped.groups.iter().map(|g| g.key.0).collect();
    months.sort_unstable();
    months.dedup();

    months
        .into_iter()
        .map(|month| MonthlyConsumption {
            month: month_name(month).unwrap_or_default().to_string(),
            materials: materials
                .iter()
                .map(|m| {
                    let group = grouped.find(&(month, m.clone()));
                    MaterialAverage {
                        raw_material: m.clone(),
                        average: group.map_or(0.0, |g| g.get("average")),
                        records: group.map_or(0, |g| g.get("records") as usize),
                    }
                })
                .collect(),
        })
        .collect()
}
