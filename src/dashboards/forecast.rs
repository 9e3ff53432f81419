//! Demand Forecast Dashboard
//! Fitted, actual and forecast demand by year, quarter and month, with accuracy and variance.

use crate::calendar::{calendar_month_cmp, month_name, quarter, DateFormat, YearMonth};
use crate::charts::{shape, SeriesOrder};
use crate::data::{FieldSpec, NormalizedRecord, NumberPolicy, Schema};
use crate::filter::{numeric_cmp, FieldOptions, FilterChain, FilterField, FilterSpec, Selection};
use crate::pipeline::{Dashboard, TypedRow};
use crate::stats::{average, current_value, group_by, total, CurrentValue, Grouped, Measure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub product: String,
    pub sku: String,
    pub depot: String,
    /// Absent when the month cell is blank or unparseable; such rows only count toward totals.
    pub period: Option<YearMonth>,
    pub fitted: f64,
    pub actual: f64,
    pub forecast: f64,
    pub accuracy: f64,
}

impl TypedRow for ForecastRow {
    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::text("product", &["product", "Product"]).required(),
            FieldSpec::text("sku", &["SKU"]).required(),
            FieldSpec::text("depot", &["Depot"]).required(),
            FieldSpec::date("month", &["Month"], DateFormat::MonthDayYear),
            FieldSpec::number("fitted", &["Fitted"], NumberPolicy::ZeroIfInvalid),
            FieldSpec::number("actual", &["Actual"], NumberPolicy::ZeroIfInvalid),
            FieldSpec::number("forecast", &["Forecast"], NumberPolicy::ZeroIfInvalid),
            FieldSpec::number("accuracy", &["Accuracy"], NumberPolicy::ZeroIfInvalid),
        ])
    }

    fn from_record(record: &NormalizedRecord) -> Option<Self> {
        Some(Self {
            product: record.text("product")?.to_string(),
            sku: record.text("sku")?.to_string(),
            depot: record.text("depot")?.to_string(),
            period: record.date("month").map(YearMonth::of),
            fitted: record.number("fitted").unwrap_or(0.0),
            actual: record.number("actual").unwrap_or(0.0),
            forecast: record.number("forecast").unwrap_or(0.0),
            accuracy: record.number("accuracy").unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastFilters {
    pub product: Option<String>,
    pub sku: Option<String>,
    pub depot: Option<String>,
    /// Long month name, e.g. `"April"`.
    pub month: Option<String>,
    pub year: Option<String>,
}

impl ForecastFilters {
    fn spec(&self) -> FilterSpec {
        FilterSpec::new()
            .with("product", Selection::single(self.product.as_deref()))
            .with("sku", Selection::single(self.sku.as_deref()))
            .with("depot", Selection::single(self.depot.as_deref()))
            .with("month", Selection::single(self.month.as_deref()))
            .with("year", Selection::single(self.year.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandPoint {
    /// `"2024"`, `"2024-Q2"` or `"Apr 2024"` depending on the series.
    pub label: String,
    pub fitted: f64,
    pub actual: f64,
    pub forecast: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyDemand {
    pub label: String,
    pub period: YearMonth,
    pub fitted: f64,
    pub actual: f64,
    pub forecast: f64,
    /// `actual - fitted`
    pub variance: f64,
    /// Rounded percent of fitted; `0` when fitted is `0`.
    pub variance_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    pub total_fitted: f64,
    pub average_accuracy: f64,
    pub current: CurrentValue,
    pub yearly: Vec<DemandPoint>,
    pub quarterly: Vec<DemandPoint>,
    pub monthly: Vec<MonthlyDemand>,
    pub options: Vec<FieldOptions>,
    pub applied: FilterSpec,
}

pub struct Forecast;

fn chain() -> FilterChain<ForecastRow> {
    FilterChain::new(vec![
        FilterField::text("product", |r: &ForecastRow| Some(r.product.clone())),
        FilterField::text("sku", |r: &ForecastRow| Some(r.sku.clone())),
        FilterField::text("depot", |r: &ForecastRow| Some(r.depot.clone())),
        FilterField::text("month", |r: &ForecastRow| {
            r.period.and_then(|p| month_name(p.month)).map(str::to_string)
        })
        .ordered_by(calendar_month_cmp),
        FilterField::text("year", |r: &ForecastRow| r.period.map(|p| p.year.to_string())).ordered_by(numeric_cmp),
    ])
}

fn demand_measures() -> [Measure<ForecastRow>; 3] {
    [
        Measure::sum("fitted", |r: &ForecastRow| Some(r.fitted)),
        Measure::sum("actual", |r: &ForecastRow| Some(r.actual)),
        Measure::sum("forecast", |r: &ForecastRow| Some(r.forecast)),
    ]
}

fn demand_series<K: Ord>(grouped: &Grouped<K>, label: impl Fn(&K) -> String) -> Vec<DemandPoint> {
    shape(grouped, SeriesOrder::KeyAsc, None, |g| DemandPoint {
        label: label(&g.key),
        fitted: g.get("fitted"),
        actual: g.get("actual"),
        forecast: g.get("forecast"),
    })
}

impl Dashboard for Forecast {
    const NAME: &'static str = "forecast";
    type Row = ForecastRow;
    type Filters = ForecastFilters;
    type Output = ForecastReport;

    fn compute(rows: &[ForecastRow], filters: &ForecastFilters) -> ForecastReport {
        let view = chain().apply(rows, &filters.spec());
        let measures = demand_measures();

        let by_year = group_by(view.iter(), |r| r.period.map(|p| p.year), &measures);
        let by_quarter = group_by(
            view.iter(),
            |r| r.period.map(|p| (p.year, quarter(p.month))),
            &measures,
        );
        let by_month = group_by(view.iter(), |r| r.period, &measures);

        let monthly = shape(&by_month, SeriesOrder::KeyAsc, None, |g| {
            let (fitted, actual) = (g.get("fitted"), g.get("actual"));
            let variance = actual - fitted;
            MonthlyDemand {
                label: g.key.short_label(),
                period: g.key,
                fitted,
                actual,
                forecast: g.get("forecast"),
                variance,
                variance_percent: if fitted == 0.0 {
                    0.0
                } else {
                    (variance / fitted * 100.0).round()
                },
            }
        });

        ForecastReport {
            total_fitted: total(view.iter(), |r| Some(r.fitted)),
            average_accuracy: average(view.iter(), |r| Some(r.accuracy)),
            current: current_value(&monthly, |m| Some(m.fitted), |m| Some(m.forecast)),
            yearly: demand_series(&by_year, |y: &i32| y.to_string()),
            quarterly: demand_series(&by_quarter, |&(y, q): &(i32, u32)| format!("{y}-Q{q}")),
            monthly,
            options: view.options.clone(),
            applied: view.resolved.clone(),
        }
    }
}
