//! OEE Dashboard
//! Monthly availability, performance and quality per machine, combined into OEE.

use crate::calendar::{DateFormat, YearMonth};
use crate::charts::{shape, SeriesOrder};
use crate::data::{FieldSpec, NormalizedRecord, NumberPolicy, Schema};
use crate::filter::{numeric_cmp, FieldOptions, FilterChain, FilterField, FilterSpec, Selection};
use crate::pipeline::{Dashboard, TypedRow};
use crate::stats::{average, group_by, Measure};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct OeeRow {
    pub date: NaiveDate,
    pub period: YearMonth,
    pub device: Option<String>,
    pub availability: Option<f64>,
    pub performance: Option<f64>,
    pub quality: Option<f64>,
}

impl TypedRow for OeeRow {
    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::date("date", &["Dates", "Date"], DateFormat::DayMonthYear).required(),
            FieldSpec::text("device", &["Device"]),
            FieldSpec::number("availability", &["Availability"], NumberPolicy::Exclude),
            FieldSpec::number("performance", &["Performance"], NumberPolicy::Exclude),
            FieldSpec::number("quality", &["Quality"], NumberPolicy::Exclude),
        ])
    }

    fn from_record(record: &NormalizedRecord) -> Option<Self> {
        let date = record.date("date")?;
        Some(Self {
            date,
            period: YearMonth::of(date),
            device: record.text("device").map(str::to_string),
            availability: record.number("availability"),
            performance: record.number("performance"),
            quality: record.number("quality"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OeeFilters {
    pub machine: Option<String>,
    /// Month number, `"1"` to `"12"`.
    pub month: Option<String>,
}

impl OeeFilters {
    fn spec(&self) -> FilterSpec {
        FilterSpec::new()
            .with("machine", Selection::single(self.machine.as_deref()))
            .with("month", Selection::single(self.month.as_deref()))
    }
}

/// OEE in percent from three percentages.
pub fn oee(availability: f64, performance: f64, quality: f64) -> f64 {
    availability * performance * quality / 10_000.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyOee {
    /// `"Mar 2024"`
    pub month: String,
    pub period: YearMonth,
    pub availability: f64,
    pub performance: f64,
    pub quality: f64,
    pub oee: f64,
    pub readings: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OverallOee {
    pub availability: f64,
    pub performance: f64,
    pub quality: f64,
    pub oee: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OeeReport {
    pub monthly: Vec<MonthlyOee>,
    pub overall: OverallOee,
    pub options: Vec<FieldOptions>,
    pub applied: FilterSpec,
}

pub struct Oee;

fn chain() -> FilterChain<OeeRow> {
    FilterChain::new(vec![
        FilterField::text("machine", |r: &OeeRow| r.device.clone()).sorted(),
        FilterField::text("month", |r: &OeeRow| Some(r.period.month.to_string())).ordered_by(numeric_cmp),
    ])
}

impl Dashboard for Oee {
    const NAME: &'static str = "oee";
    type Row = OeeRow;
    type Filters = OeeFilters;
    type Output = OeeReport;

    fn compute(rows: &[OeeRow], filters: &OeeFilters) -> OeeReport {
        let view = chain().apply(rows, &filters.spec());

        let by_month = group_by(
            view.iter(),
            |r| Some(r.period),
            &[
                Measure::average("availability", |r: &OeeRow| r.availability),
                Measure::average("performance", |r: &OeeRow| r.performance),
                Measure::average("quality", |r: &OeeRow| r.quality),
            ],
        );
        let monthly = shape(&by_month, SeriesOrder::KeyAsc, None, |g| {
            let (a, p, q) = (g.get("availability"), g.get("performance"), g.get("quality"));
            MonthlyOee {
                month: g.key.short_label(),
                period: g.key,
                availability: a,
                performance: p,
                quality: q,
                oee: oee(a, p, q),
                readings: g.rows,
            }
        });

        // overall figures average the monthly figures, so each month weighs the same
        let availability = average(&monthly, |m| Some(m.availability));
        let performance = average(&monthly, |m| Some(m.performance));
        let quality = average(&monthly, |m| Some(m.quality));

        OeeReport {
            overall: OverallOee {
                availability,
                performance,
                quality,
                oee: oee(availability, performance, quality),
            },
            monthly,
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

    fn raw(date: &str, device: &str, a: &str, p: &str, q: &str) -> RawRecord {
        RawRecord::new()
            .with("Dates", date)
            .with("Device", device)
            .with("Availability", a)
            .with("Performance", p)
            .with("Quality", q)
    }

    fn dataset() -> Dataset<OeeRow> {
        Dataset::from_raw(&[
            raw("05-02-2024", "M1", "80", "90", "100"),
            raw("15-01-2024", "M1", "90", "80", "100"),
            raw("20-01-2024", "M2", "70", "", "100"),
            raw("2024-01-20", "M2", "70", "60", "100"),
        ])
    }

    #[test]
    fn unparseable_dates_are_excluded() {
        let data = dataset();
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn months_are_chronological_with_component_averages() {
        let data = dataset();
        let report = Oee::compute(data.rows(), &OeeFilters::default());
        let months: Vec<&str> = report.monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["Jan 2024", "Feb 2024"]);

        let jan = &report.monthly[0];
        assert_eq!(jan.availability, 80.0);
        // the blank performance reading is skipped, not counted as zero
        assert_eq!(jan.performance, 80.0);
        assert_eq!(jan.readings, 2);
        assert!((jan.oee - 64.0).abs() < 1e-9);
    }

    #[test]
    fn overall_oee_comes_from_averaged_components() {
        let data = dataset();
        let report = Oee::compute(data.rows(), &OeeFilters::default());
        assert_eq!(report.overall.availability, 80.0);
        assert_eq!(report.overall.performance, 85.0);
        assert_eq!(report.overall.quality, 100.0);
        assert!((report.overall.oee - 68.0).abs() < 1e-9);
    }

    #[test]
    fn machine_then_month() {
        let data = dataset();
        let f = OeeFilters {
            machine: Some("M1".into()),
            month: Some("2".into()),
        };
        let report = Oee::compute(data.rows(), &f);
        assert_eq!(report.monthly.len(), 1);
        assert_eq!(report.monthly[0].oee, 72.0);
        let months = &report.options[1].values;
        assert_eq!(months, &vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn empty_view_is_all_zero() {
        let data = dataset();
        let f = OeeFilters {
            machine: Some("M9".into()),
            ..Default::default()
        };
        let report = Oee::compute(data.rows(), &f);
        assert!(report.monthly.is_empty());
        assert_eq!(report.overall, OverallOee::default());
    }
}
