//! Water Dashboard
//! Daily inflow and consumption with underground tank levels and water quality.

use crate::calendar::DateFormat;
use crate::data::{FieldSpec, NormalizedRecord, NumberPolicy, Schema};
use crate::filter::{FieldOptions, FilterChain, FilterField, FilterSpec, Selection};
use crate::pipeline::{Dashboard, TypedRow};
use crate::stats::total;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Level and volume of one underground tank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Tank {
    pub level: f64,
    pub volume: f64,
}

impl Tank {
    fn has_reading(&self) -> bool {
        self.level > 0.0 || self.volume > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterRow {
    pub date: NaiveDate,
    pub inflow: f64,
    pub consumed: f64,
    pub ug1: Tank,
    pub ug2: Tank,
    pub ug3: Tank,
    pub ug2_tds: f64,
    pub ug2_ph: f64,
    pub ug3_tds: f64,
}

impl WaterRow {
    fn has_tank_reading(&self) -> bool {
        [self.ug1, self.ug2, self.ug3].iter().any(Tank::has_reading)
    }
}

fn reading(name: &'static str, columns: &'static [&'static str]) -> FieldSpec {
    FieldSpec::number(name, columns, NumberPolicy::ZeroIfInvalid)
}

impl TypedRow for WaterRow {
    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::date("date", &["Date"], DateFormat::DayMonthYear).required(),
            reading("inflow", &["UG1_Inflow_L"]),
            reading("consumed", &["Water_Consumed_L"]),
            reading("ug1_level", &["UG1_Level"]),
            reading("ug1_volume", &["UG1_Volume_L"]),
            reading("ug2_level", &["UG2_Level"]),
            reading("ug2_volume", &["UG2_Volume_L"]),
            reading("ug2_tds", &["UG2_TDS"]),
            reading("ug2_ph", &["UG2_pH"]),
            reading("ug3_level", &["UG3_Level"]),
            reading("ug3_volume", &["UG3_Volume_L"]),
            reading("ug3_tds", &["UG3_TDS"]),
        ])
    }

    fn from_record(record: &NormalizedRecord) -> Option<Self> {
        let n = |field: &str| record.number(field).unwrap_or(0.0);
        let tank = |level: &str, volume: &str| Tank {
            level: n(level),
            volume: n(volume),
        };
        Some(Self {
            date: record.date("date")?,
            inflow: n("inflow"),
            consumed: n("consumed"),
            ug1: tank("ug1_level", "ug1_volume"),
            ug2: tank("ug2_level", "ug2_volume"),
            ug3: tank("ug3_level", "ug3_volume"),
            ug2_tds: n("ug2_tds"),
            ug2_ph: n("ug2_ph"),
            ug3_tds: n("ug3_tds"),
        })
    }
}

/// Inclusive date window; either bound may be left open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterFilters {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl WaterFilters {
    fn spec(&self) -> FilterSpec {
        FilterSpec::new().with("date", Selection::range(self.start, self.end))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyWater {
    /// `"DD-MM-YYYY"`
    pub date: String,
    pub inflow: f64,
    pub consumed: f64,
    pub ug2_tds: f64,
    pub ug3_tds: f64,
    pub ug2_ph: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterReport {
    pub total_inflow: f64,
    pub total_consumed: f64,
    /// Most recent row with a tank reading, else the last row.
    pub latest: Option<WaterRow>,
    /// One entry per row, in file order.
    pub daily: Vec<DailyWater>,
    pub options: Vec<FieldOptions>,
    pub applied: FilterSpec,
}

pub struct Water;

fn chain() -> FilterChain<WaterRow> {
    FilterChain::new(vec![FilterField::date("date", |r: &WaterRow| Some(r.date))])
}

impl Dashboard for Water {
    const NAME: &'static str = "water";
    type Row = WaterRow;
    type Filters = WaterFilters;
    type Output = WaterReport;

    fn compute(rows: &[WaterRow], filters: &WaterFilters) -> WaterReport {
        let view = chain().apply(rows, &filters.spec());

        let latest = view
            .rows
            .iter()
            .rev()
            .find(|r| r.has_tank_reading())
            .or_else(|| view.rows.last())
            .map(|r| (*r).clone());

        let daily = view
            .iter()
            .map(|r| DailyWater {
                date: r.date.format("%d-%m-%Y").to_string(),
                inflow: r.inflow,
                consumed: r.consumed,
                ug2_tds: r.ug2_tds,
                ug3_tds: r.ug3_tds,
                ug2_ph: r.ug2_ph,
            })
            .collect();

        WaterReport {
            total_inflow: total(view.iter(), |r| Some(r.inflow)),
            total_consumed: total(view.iter(), |r| Some(r.consumed)),
            latest,
            daily,
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

    fn raw(date: &str, inflow: &str, consumed: &str, ug1_level: &str) -> RawRecord {
        RawRecord::new()
            .with("Date", date)
            .with("UG1_Inflow_L", inflow)
            .with("Water_Consumed_L", consumed)
            .with("UG1_Level", ug1_level)
            .with("UG2_TDS", "310")
    }

    fn dataset() -> Dataset<WaterRow> {
        Dataset::from_raw(&[
            raw("01-03-2024", "500", "300", "2.5"),
            raw("02-03-2024", "400", "bad", "3.0"),
            raw("03-03-2024", "100", "200", ""),
            raw(" ", "100", "200", "1.0"),
        ])
    }

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 3, d)
    }

    #[test]
    fn totals_treat_bad_readings_as_zero() {
        let data = dataset();
        assert_eq!(data.len(), 3);
        let report = Water::compute(data.rows(), &WaterFilters::default());
        assert_eq!(report.total_inflow, 1000.0);
        assert_eq!(report.total_consumed, 500.0);
        assert_eq!(report.daily.len(), 3);
        assert_eq!(report.daily[1].date, "02-03-2024");
    }

    #[test]
    fn latest_prefers_rows_with_tank_readings() {
        let data = dataset();
        let report = Water::compute(data.rows(), &WaterFilters::default());
        let latest = report.latest.expect("latest row");
        assert_eq!(latest.date, day(2).unwrap());
        assert_eq!(latest.ug1.level, 3.0);
    }

    #[test]
    fn latest_falls_back_to_last_row() {
        let data = dataset();
        let f = WaterFilters {
            start: day(3),
            end: None,
        };
        let report = Water::compute(data.rows(), &f);
        assert_eq!(report.latest.map(|r| r.date), day(3));
    }

    #[test]
    fn range_is_inclusive() {
        let data = dataset();
        let f = WaterFilters {
            start: day(1),
            end: day(2),
        };
        let report = Water::compute(data.rows(), &f);
        assert_eq!(report.daily.len(), 2);
        assert_eq!(report.total_inflow, 900.0);

        let f = WaterFilters {
            start: day(10),
            end: None,
        };
        let report = Water::compute(data.rows(), &f);
        assert!(report.latest.is_none());
        assert_eq!(report.total_consumed, 0.0);
    }
}
