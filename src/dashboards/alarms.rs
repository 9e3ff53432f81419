//! Alarm Dashboard
//! Alarm counts by category, device and day.

use crate::calendar::{month_label_cmp, DateFormat, YearMonth};
use crate::charts::{shape, SeriesOrder};
use crate::data::{FieldSpec, NormalizedRecord, Schema};
use crate::filter::{FieldOptions, FilterChain, FilterField, FilterSpec, Selection};
use crate::pipeline::{Dashboard, TypedRow};
use crate::stats::{group_by, percentage, Measure};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const UNCATEGORIZED: &str = "Uncategorized";
const TOP_DEVICES: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct AlarmRow {
    pub alarm_number: String,
    pub date: Option<NaiveDate>,
    pub device: Option<String>,
    pub category: Option<String>,
}

impl TypedRow for AlarmRow {
    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::text("alarm_number", &["AlaNum"]).required(),
            FieldSpec::date("date", &["date", "Date"], DateFormat::Auto),
            FieldSpec::text("device", &["Device"]),
            FieldSpec::text("category", &["Alarm Category"]),
        ])
    }

    fn from_record(record: &NormalizedRecord) -> Option<Self> {
        let owned = |field: &str| record.text(field).map(str::to_string);
        Some(Self {
            alarm_number: owned("alarm_number")?,
            date: record.date("date"),
            device: owned("device"),
            category: owned("category"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmFilters {
    pub device: Option<String>,
    /// `"Mar 2024"`
    pub month: Option<String>,
}

impl AlarmFilters {
    fn spec(&self) -> FilterSpec {
        FilterSpec::new()
            .with("device", Selection::single(self.device.as_deref()))
            .with("month", Selection::single(self.month.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAlarms {
    pub date: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceCount {
    pub device: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmReport {
    pub total_alarms: usize,
    pub categories: Vec<CategoryCount>,
    pub daily: Vec<DailyAlarms>,
    pub top_devices: Vec<DeviceCount>,
    pub top_category: Option<CategoryCount>,
    pub top_device: Option<DeviceCount>,
    pub options: Vec<FieldOptions>,
    pub applied: FilterSpec,
}

pub struct Alarms;

fn chain() -> FilterChain<AlarmRow> {
    FilterChain::new(vec![
        FilterField::text("device", |r: &AlarmRow| r.device.clone()).sorted(),
        FilterField::text("month", |r: &AlarmRow| r.date.map(|d| YearMonth::of(d).short_label()))
            .ordered_by(month_label_cmp),
    ])
}

impl Dashboard for Alarms {
    const NAME: &'static str = "alarms";
    type Row = AlarmRow;
    type Filters = AlarmFilters;
    type Output = AlarmReport;

    fn compute(rows: &[AlarmRow], filters: &AlarmFilters) -> AlarmReport {
        let view = chain().apply(rows, &filters.spec());
        let total_alarms = view.rows.len();

        let by_category = group_by(
            view.iter(),
            |r| Some(r.category.clone().unwrap_or_else(|| UNCATEGORIZED.to_string())),
            &[],
        );
        let categories = shape(&by_category, SeriesOrder::Encounter, None, |g| CategoryCount {
            category: g.key.clone(),
            count: g.rows,
            percentage: percentage(g.rows as f64, total_alarms as f64),
        });
        // first category reaching the highest count
        let top_category = categories
            .iter()
            .fold(None::<&CategoryCount>, |best, c| match best {
                Some(b) if b.count >= c.count => Some(b),
                _ => Some(c),
            })
            .cloned();

        let by_day = group_by(view.iter(), |r| r.date, &[]);
        let daily = shape(&by_day, SeriesOrder::KeyAsc, None, |g| DailyAlarms {
            date: g.key.format("%Y-%m-%d").to_string(),
            count: g.rows,
        });

        let by_device = group_by(
            view.iter(),
            |r| r.device.clone(),
            &[Measure::count("alarms")],
        );
        let top_devices = shape(
            &by_device,
            SeriesOrder::ValueDesc("alarms"),
            Some(TOP_DEVICES),
            |g| DeviceCount {
                device: g.key.clone(),
                count: g.rows,
            },
        );
        let top_device = top_devices.first().cloned();

        AlarmReport {
            total_alarms,
            categories,
            daily,
            top_devices,
            top_category,
            top_device,
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

    fn raw(num: &str, date: &str, device: &str, category: &str) -> RawRecord {
        RawRecord::new()
            .with("AlaNum", num)
            .with("date", date)
            .with("Device", device)
            .with("Alarm Category", category)
    }

    fn dataset() -> Dataset<AlarmRow> {
        Dataset::from_raw(&[
            raw("1", "2024-03-02", "M1", "Electrical"),
            raw("2", "2024-03-01", "M2", "Mechanical"),
            raw("3", "2024-03-02", "M2", "Mechanical"),
            raw("4", "", "M3", "Electrical"),
            raw("5", "2024-04-01", "M1", ""),
            raw("", "2024-04-01", "M1", "Electrical"),
        ])
    }

    #[test]
    fn alarm_number_is_required() {
        assert_eq!(dataset().len(), 5);
    }

    #[test]
    fn categories_with_percentages() {
        let data = dataset();
        let report = Alarms::compute(data.rows(), &AlarmFilters::default());
        assert_eq!(report.total_alarms, 5);
        let cats: Vec<(&str, usize, f64)> = report
            .categories
            .iter()
            .map(|c| (c.category.as_str(), c.count, c.percentage))
            .collect();
        assert_eq!(
            cats,
            vec![("Electrical", 2, 40.0), ("Mechanical", 2, 40.0), (UNCATEGORIZED, 1, 20.0)]
        );
        // a tie keeps the first category
        assert_eq!(report.top_category.map(|c| c.category), Some("Electrical".to_string()));
    }

    #[test]
    fn daily_counts_skip_undated_rows() {
        let data = dataset();
        let report = Alarms::compute(data.rows(), &AlarmFilters::default());
        let days: Vec<(&str, usize)> = report.daily.iter().map(|d| (d.date.as_str(), d.count)).collect();
        assert_eq!(days, vec![("2024-03-01", 1), ("2024-03-02", 2), ("2024-04-01", 1)]);
    }

    #[test]
    fn top_devices_are_stable_on_ties() {
        let data = dataset();
        let report = Alarms::compute(data.rows(), &AlarmFilters::default());
        let devices: Vec<(&str, usize)> = report
            .top_devices
            .iter()
            .map(|d| (d.device.as_str(), d.count))
            .collect();
        assert_eq!(devices, vec![("M1", 2), ("M2", 2), ("M3", 1)]);
        assert_eq!(report.top_device.map(|d| d.device), Some("M1".to_string()));
    }

    #[test]
    fn month_filter_drops_undated_rows() {
        let data = dataset();
        let f = AlarmFilters {
            month: Some("Mar 2024".into()),
            ..Default::default()
        };
        let report = Alarms::compute(data.rows(), &f);
        assert_eq!(report.total_alarms, 3);
        assert_eq!(report.options[1].values, vec!["Mar 2024", "Apr 2024"]);
    }

    #[test]
    fn nothing_matches() {
        let data = dataset();
        let f = AlarmFilters {
            device: Some("M9".into()),
            ..Default::default()
        };
        let report = Alarms::compute(data.rows(), &f);
        assert_eq!(report.total_alarms, 0);
        assert!(report.categories.is_empty());
        assert!(report.top_category.is_none());
        assert!(report.top_device.is_none());
    }
}
