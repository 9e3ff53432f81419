//! Maintenance Dashboard
//! Moulding process parameters per machine: monthly ranges and time spent outside the
//! operating band, and a before/after comparison around a breakdown.

use crate::calendar::{month_label_cmp, DateFormat, YearMonth};
use crate::charts::{shape, SeriesOrder};
use crate::data::{FieldSpec, NormalizedRecord, NumberPolicy, Schema};
use crate::filter::{FieldOptions, FilterChain, FilterField, FilterSpec, Selection};
use crate::pipeline::{Dashboard, TypedRow};
use crate::stats::{group_by, percentage, Grouped, Measure};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Days on each side of a breakdown that the comparison looks at.
pub const WINDOW_DAYS: u64 = 7;

const PARAMETER_COUNT: usize = 9;

/// A monitored process parameter and its operating band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    pub name: &'static str,
    pub label: &'static str,
    pub columns: &'static [&'static str],
    pub min: f64,
    pub max: f64,
}

impl Parameter {
    pub fn in_band(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

pub const PARAMETERS: [Parameter; PARAMETER_COUNT] = [
    Parameter {
        name: "cycle_time",
        label: "Cycle Time",
        columns: &["Cycle_Time_sec"],
        min: 29.0,
        max: 30.0,
    },
    Parameter {
        name: "oil_temperature",
        label: "Oil Temperature",
        columns: &["Oil_Temperature_C"],
        min: 58.0,
        max: 60.0,
    },
    Parameter {
        name: "nozzle_temperature",
        label: "Nozzle Temperature",
        columns: &["Nozzle_Temperature_C"],
        min: 218.0,
        max: 225.0,
    },
    Parameter {
        name: "melt_cushion",
        label: "Melt Cushion",
        columns: &["Melt_Cushion_mm"],
        min: 4.5,
        max: 5.0,
    },
    Parameter {
        name: "cooling_time",
        label: "Cooling Time",
        columns: &["Cooling_Time_sec"],
        min: 9.0,
        max: 10.0,
    },
    Parameter {
        name: "zone_temperature",
        label: "Zone Temperature",
        // the plant extract misspells this header
        columns: &["Zone Temerature", "Zone Temperature"],
        min: 123.0,
        max: 125.0,
    },
    Parameter {
        name: "water_in_temperature",
        label: "Water In Temperature",
        columns: &["Water_In_Temp_C"],
        min: 20.0,
        max: 21.0,
    },
    Parameter {
        name: "water_out_temperature",
        label: "Water Out Temperature",
        columns: &["Water_Out_Temp_C"],
        min: 24.0,
        max: 26.0,
    },
    Parameter {
        name: "feed_temperature",
        label: "Feed Temperature",
        columns: &["Feed_Temperature_C"],
        min: 24.0,
        max: 26.0,
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceRow {
    pub date: NaiveDate,
    pub period: YearMonth,
    pub machine: String,
    pub breakdown_machine: Option<String>,
    pub breakdown_date: Option<NaiveDate>,
    /// One slot per entry of `PARAMETERS`; blank or unreadable cells are `None`.
    pub readings: [Option<f64>; PARAMETER_COUNT],
}

impl TypedRow for MaintenanceRow {
    fn schema() -> Schema {
        let mut fields = vec![
            FieldSpec::date("date", &["Date"], DateFormat::Auto).required(),
            FieldSpec::text("machine", &["Machine", "Breakdown Machine"]).required(),
            FieldSpec::text("breakdown_machine", &["Breakdown Machine"]),
            FieldSpec::date("breakdown_date", &["Breakdown Date"], DateFormat::Auto),
        ];
        fields.extend(
            PARAMETERS
                .iter()
                .map(|p| FieldSpec::number(p.name, p.columns, NumberPolicy::Exclude)),
        );
        Schema::new(fields)
    }

    fn from_record(record: &NormalizedRecord) -> Option<Self> {
        let date = record.date("date")?;
        Some(Self {
            date,
            period: YearMonth::of(date),
            machine: record.text("machine")?.to_string(),
            breakdown_machine: record.text("breakdown_machine").map(str::to_string),
            breakdown_date: record.date("breakdown_date"),
            readings: std::array::from_fn(|i| record.number(PARAMETERS[i].name)),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceFilters {
    pub machine: Option<String>,
    /// `"March 2024"`
    pub month: Option<String>,
    /// Compared against the week before and after; needs a single machine.
    pub breakdown_date: Option<NaiveDate>,
}

impl MaintenanceFilters {
    fn spec(&self) -> FilterSpec {
        FilterSpec::new()
            .with("machine", Selection::single(self.machine.as_deref()))
            .with("month", Selection::single(self.month.as_deref()))
    }
}

/// Monthly statistics of one parameter. `min`, `max` and `mean` are absent without readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterStats {
    pub parameter: &'static str,
    pub label: &'static str,
    pub band_min: f64,
    pub band_max: f64,
    pub readings: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub out_of_band: usize,
    /// Share of the month's rows with this parameter outside its band.
    pub out_of_band_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyParameters {
    pub machine: String,
    /// `"March 2024"`
    pub month: String,
    pub period: YearMonth,
    pub rows: usize,
    pub parameters: Vec<ParameterStats>,
}

/// Average, min and max over one comparison window; all `0` without readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WindowStats {
    pub readings: usize,
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterComparison {
    pub parameter: &'static str,
    pub label: &'static str,
    pub before: WindowStats,
    pub after: WindowStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownComparison {
    pub machine: String,
    pub breakdown_date: NaiveDate,
    pub before_rows: usize,
    pub after_rows: usize,
    pub parameters: Vec<ParameterComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub machine: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceReport {
    pub monthly: Vec<MonthlyParameters>,
    /// Recorded breakdowns of the picked machine (or every machine), for the date picker.
    pub breakdowns: Vec<Breakdown>,
    pub comparison: Option<BreakdownComparison>,
    pub options: Vec<FieldOptions>,
    pub applied: FilterSpec,
}

pub struct Maintenance;

fn chain() -> FilterChain<MaintenanceRow> {
    FilterChain::new(vec![
        FilterField::text("machine", |r: &MaintenanceRow| Some(r.machine.clone())).sorted(),
        FilterField::text("month", |r: &MaintenanceRow| Some(r.period.long_label()))
            .ordered_by(month_label_cmp),
    ])
}

/// One parameter value of one row.
struct Reading<'a> {
    row: &'a MaintenanceRow,
    parameter: usize,
    value: f64,
}

fn readings<'a>(rows: impl IntoIterator<Item = &'a MaintenanceRow>) -> Vec<Reading<'a>> {
    rows.into_iter()
        .flat_map(|row| {
            row.readings
                .iter()
                .enumerate()
                .filter_map(move |(parameter, v)| v.map(|value| Reading { row, parameter, value }))
        })
        .collect()
}

fn value(r: &Reading) -> Option<f64> {
    Some(r.value)
}

fn out_of_band(r: &Reading) -> Option<f64> {
    Some(if PARAMETERS[r.parameter].in_band(r.value) { 0.0 } else { 1.0 })
}

fn window_measures<'a>() -> [Measure<Reading<'a>>; 3] {
    [
        Measure::average("average", value),
        Measure::min("min", value),
        Measure::max("max", value),
    ]
}

fn by_parameter(readings: &[Reading<'_>]) -> Grouped<usize> {
    group_by(readings, |r| Some(r.parameter), &window_measures())
}

fn window_stats(grouped: &Grouped<usize>, parameter: usize) -> WindowStats {
    grouped
        .find(&parameter)
        .map_or_else(WindowStats::default, |g| WindowStats {
            readings: g.rows,
            average: g.get("average"),
            min: g.get("min"),
            max: g.get("max"),
        })
}

/// Rows of `machine` in the weeks either side of `date`; the breakdown day itself is in neither.
fn compare(rows: &[MaintenanceRow], machine: &str, date: NaiveDate) -> BreakdownComparison {
    let window = Days::new(WINDOW_DAYS);
    let day = Days::new(1);
    let before = Selection::range(date.checked_sub_days(window), date.checked_sub_days(day));
    let after = Selection::range(date.checked_add_days(day), date.checked_add_days(window));

    let of_machine = || rows.iter().filter(|r| r.machine == machine);
    let before_rows: Vec<&MaintenanceRow> =
        of_machine().filter(|r| before.matches_date(Some(r.date))).collect();
    let after_rows: Vec<&MaintenanceRow> =
        of_machine().filter(|r| after.matches_date(Some(r.date))).collect();

    let before_stats = by_parameter(&readings(before_rows.iter().copied()));
    let after_stats = by_parameter(&readings(after_rows.iter().copied()));

    BreakdownComparison {
        machine: machine.to_string(),
        breakdown_date: date,
        before_rows: before_rows.len(),
        after_rows: after_rows.len(),
        parameters: PARAMETERS
            .iter()
            .enumerate()
            .map(|(i, p)| ParameterComparison {
                parameter: p.name,
                label: p.label,
                before: window_stats(&before_stats, i),
                after: window_stats(&after_stats, i),
            })
            .collect(),
    }
}

impl Dashboard for Maintenance {
    const NAME: &'static str = "maintenance";
    type Row = MaintenanceRow;
    type Filters = MaintenanceFilters;
    type Output = MaintenanceReport;

    fn compute(rows: &[MaintenanceRow], filters: &MaintenanceFilters) -> MaintenanceReport {
        let view = chain().apply(rows, &filters.spec());

        let by_month = group_by(
            view.iter(),
            |r| Some((r.machine.clone(), r.period)),
            &[Measure::count("rows")],
        );
        let values = readings(view.iter());
        let by_parameter = group_by(
            &values,
            |r| Some((r.row.machine.clone(), r.row.period, r.parameter)),
            &[
                Measure::min("min", value),
                Measure::max("max", value),
                Measure::average("mean", value),
                Measure::sum("out_of_band", out_of_band),
            ],
        );

        let monthly = shape(&by_month, SeriesOrder::KeyAsc, None, |g| {
            let (machine, period) = &g.key;
            let parameters = PARAMETERS
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let stats = by_parameter.find(&(machine.clone(), *period, i));
                    let outside = stats.map_or(0.0, |s| s.get("out_of_band"));
                    ParameterStats {
                        parameter: p.name,
                        label: p.label,
                        band_min: p.min,
                        band_max: p.max,
                        readings: stats.map_or(0, |s| s.rows),
                        min: stats.map(|s| s.get("min")),
                        max: stats.map(|s| s.get("max")),
                        mean: stats.map(|s| s.get("mean")),
                        out_of_band: outside as usize,
                        out_of_band_percent: percentage(outside, g.rows as f64),
                    }
                })
                .collect();
            MonthlyParameters {
                machine: machine.clone(),
                month: period.long_label(),
                period: *period,
                rows: g.rows,
                parameters,
            }
        });

        // Breakdowns ignore the month so a week-long window can cross month ends
        let machine = view.resolved.get("machine");
        let recorded = group_by(
            rows.iter()
                .filter(|r| machine.matches_text(r.breakdown_machine.as_deref())),
            |r| Some((r.breakdown_machine.clone()?, r.breakdown_date?)),
            &[Measure::count("rows")],
        );
        let breakdowns = shape(&recorded, SeriesOrder::KeyAsc, None, |g| Breakdown {
            machine: g.key.0.clone(),
            date: g.key.1,
        });

        let comparison = match (machine, filters.breakdown_date) {
            (Selection::One(m), Some(date)) => Some(compare(rows, m, date)),
            _ => None,
        };

        MaintenanceReport {
            monthly,
            breakdowns,
            comparison,
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

    fn raw(date: &str, machine: &str, cycle: &str, oil: &str) -> RawRecord {
        RawRecord::new()
            .with("Date", date)
            .with("Machine", machine)
            .with("Cycle_Time_sec", cycle)
            .with("Oil_Temperature_C", oil)
    }

    fn dataset() -> Dataset<MaintenanceRow> {
        Dataset::from_raw(&[
            raw("2024-03-01", "IMM-1", "29.5", "59"),
            raw("2024-03-02", "IMM-1", "31", "61"),
            raw("2024-03-03", "IMM-1", "28", ""),
            raw("2024-03-05", "IMM-1", "29", "58")
                .with("Breakdown Machine", "IMM-1")
                .with("Breakdown Date", "2024-03-05"),
            raw("2024-03-08", "IMM-1", "30", "60"),
            raw("2024-03-12", "IMM-1", "29", "59"),
            raw("2024-04-01", "IMM-2", "35", "59"),
        ])
    }

    fn stats<'a>(month: &'a MonthlyParameters, name: &str) -> &'a ParameterStats {
        month
            .parameters
            .iter()
            .find(|p| p.parameter == name)
            .unwrap()
    }

    #[test]
    fn bands_are_inclusive() {
        let cycle = PARAMETERS[0];
        assert!(cycle.in_band(29.0));
        assert!(cycle.in_band(30.0));
        assert!(!cycle.in_band(30.01));
    }

    #[test]
    fn misspelled_zone_header_is_read() {
        let data = Dataset::<MaintenanceRow>::from_raw(&[RawRecord::new()
            .with("Date", "2024-03-01")
            .with("Machine", "IMM-1")
            .with("Zone Temerature", "124")]);
        assert_eq!(data.rows()[0].readings[5], Some(124.0));
    }

    #[test]
    fn monthly_ranges_and_deviation_per_machine() {
        let data = dataset();
        let report = Maintenance::compute(data.rows(), &MaintenanceFilters::default());
        assert_eq!(report.monthly.len(), 2);

        let march = &report.monthly[0];
        assert_eq!(march.machine, "IMM-1");
        assert_eq!(march.month, "March 2024");
        assert_eq!(march.rows, 6);

        let cycle = stats(march, "cycle_time");
        assert_eq!(cycle.readings, 6);
        assert_eq!(cycle.min, Some(28.0));
        assert_eq!(cycle.max, Some(31.0));
        assert!((cycle.mean.unwrap() - 29.416_666).abs() < 1e-5);
        assert_eq!(cycle.out_of_band, 2);
        assert!((cycle.out_of_band_percent - 100.0 / 3.0).abs() < 1e-9);

        // the blank oil cell is not a reading but still counts toward the month's rows
        let oil = stats(march, "oil_temperature");
        assert_eq!(oil.readings, 5);
        assert_eq!(oil.out_of_band, 1);
        assert!((oil.out_of_band_percent - 100.0 / 6.0).abs() < 1e-9);

        let nozzle = stats(march, "nozzle_temperature");
        assert_eq!(nozzle.readings, 0);
        assert_eq!(nozzle.mean, None);
        assert_eq!(nozzle.out_of_band_percent, 0.0);
    }

    #[test]
    fn machine_then_month() {
        let data = dataset();
        let f = MaintenanceFilters {
            machine: Some("IMM-2".into()),
            month: Some("March 2024".into()),
            ..Default::default()
        };
        let report = Maintenance::compute(data.rows(), &f);
        // March has no IMM-2 rows, so the month pick is reset
        assert!(report.applied.get("month").is_all());
        assert_eq!(report.monthly.len(), 1);
        assert_eq!(report.monthly[0].month, "April 2024");
        assert_eq!(stats(&report.monthly[0], "cycle_time").out_of_band, 1);
    }

    #[test]
    fn week_before_and_after_a_breakdown() {
        let data = dataset();
        let f = MaintenanceFilters {
            machine: Some("IMM-1".into()),
            breakdown_date: NaiveDate::from_ymd_opt(2024, 3, 5),
            ..Default::default()
        };
        let report = Maintenance::compute(data.rows(), &f);
        assert_eq!(
            report.breakdowns,
            vec![Breakdown {
                machine: "IMM-1".into(),
                date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            }]
        );

        let cmp = report.comparison.unwrap();
        assert_eq!(cmp.before_rows, 3);
        assert_eq!(cmp.after_rows, 2);
        let cycle = &cmp.parameters[0];
        assert_eq!(cycle.before.min, 28.0);
        assert_eq!(cycle.before.max, 31.0);
        assert!((cycle.before.average - 29.5).abs() < 1e-9);
        assert_eq!(cycle.after.average, 29.5);
        let nozzle = &cmp.parameters[2];
        assert_eq!(nozzle.before, WindowStats::default());
    }

    #[test]
    fn comparison_needs_one_machine() {
        let data = dataset();
        let f = MaintenanceFilters {
            breakdown_date: NaiveDate::from_ymd_opt(2024, 3, 5),
            ..Default::default()
        };
        let report = Maintenance::compute(data.rows(), &f);
        assert!(report.comparison.is_none());
        assert_eq!(report.breakdowns.len(), 1);
    }
}
