//! Energy Dashboard
//! Energy use, production and carbon emission per machine and per day.

use crate::calendar::{month_label_cmp, DateFormat, YearMonth};
use crate::charts::{shape, SeriesOrder};
use crate::data::{FieldSpec, NormalizedRecord, NumberPolicy, Schema};
use crate::filter::{FieldOptions, FilterChain, FilterField, FilterSpec, Selection};
use crate::pipeline::{Dashboard, TypedRow};
use crate::stats::{average, group_by, total, Measure};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Device bucket for rows with a blank device.
pub const UNKNOWN_DEVICE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct EnergyRow {
    pub date: NaiveDate,
    pub period: YearMonth,
    pub device: String,
    pub production: f64,
    pub energy: f64,
    pub energy_per_part: f64,
    pub carbon: f64,
}

impl TypedRow for EnergyRow {
    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::date("date", &["date", "Date"], DateFormat::Auto).required(),
            FieldSpec::number("production", &["Actual Production"], NumberPolicy::Exclude).required(),
            FieldSpec::number("energy", &["Energy consumption"], NumberPolicy::ZeroIfInvalid),
            FieldSpec::number(
                "energy_per_part",
                &["Average Energy per good part"],
                NumberPolicy::ZeroIfInvalid,
            ),
            FieldSpec::number(
                "carbon",
                &["Carbon emission(0.716 g ofCO2/kWh)", "Carbon emission"],
                NumberPolicy::ZeroIfInvalid,
            ),
            FieldSpec::text("device", &["Device"]),
        ])
    }

    fn from_record(record: &NormalizedRecord) -> Option<Self> {
        let date = record.date("date")?;
        Some(Self {
            date,
            period: YearMonth::of(date),
            device: record.text_or("device", UNKNOWN_DEVICE),
            production: record.number("production")?,
            energy: record.number("energy").unwrap_or(0.0),
            energy_per_part: record.number("energy_per_part").unwrap_or(0.0),
            carbon: record.number("carbon").unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyFilters {
    pub machine: Option<String>,
    /// `"Mar 2024"`
    pub month: Option<String>,
}

impl EnergyFilters {
    fn spec(&self) -> FilterSpec {
        FilterSpec::new()
            .with("machine", Selection::single(self.machine.as_deref()))
            .with("month", Selection::single(self.month.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEnergy {
    pub device: String,
    pub energy: f64,
    pub carbon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyEnergy {
    /// ISO day
    pub date: String,
    pub energy: f64,
    pub production: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyShare {
    pub device: String,
    pub energy: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyReport {
    pub total_energy: f64,
    pub average_energy_per_part: f64,
    pub total_carbon: f64,
    pub most_efficient_device: Option<String>,
    pub by_device: Vec<DeviceEnergy>,
    pub daily: Vec<DailyEnergy>,
    pub energy_share: Vec<EnergyShare>,
    pub options: Vec<FieldOptions>,
    pub applied: FilterSpec,
}

pub struct Energy;

fn chain() -> FilterChain<EnergyRow> {
    FilterChain::new(vec![
        FilterField::text("machine", |r: &EnergyRow| Some(r.device.clone())).sorted(),
        FilterField::text("month", |r: &EnergyRow| Some(r.period.short_label())).ordered_by(month_label_cmp),
    ])
}

impl Dashboard for Energy {
    const NAME: &'static str = "energy";
    type Row = EnergyRow;
    type Filters = EnergyFilters;
    type Output = EnergyReport;

    fn compute(rows: &[EnergyRow], filters: &EnergyFilters) -> EnergyReport {
        let view = chain().apply(rows, &filters.spec());

        // first row wins a tie for the lowest reading
        let most_efficient_device = view
            .iter()
            .filter(|r| r.energy_per_part > 0.0)
            .fold(None::<&EnergyRow>, |best, r| match best {
                Some(b) if b.energy_per_part <= r.energy_per_part => Some(b),
                _ => Some(r),
            })
            .map(|r| r.device.clone());

        let by_device_groups = group_by(
            view.iter(),
            |r| Some(r.device.clone()),
            &[
                Measure::sum("energy", |r: &EnergyRow| Some(r.energy)),
                Measure::sum("carbon", |r: &EnergyRow| Some(r.carbon)),
            ],
        );
        let by_device = shape(&by_device_groups, SeriesOrder::Encounter, None, |g| DeviceEnergy {
            device: g.key.clone(),
            energy: g.get("energy"),
            carbon: g.get("carbon"),
        });
        let energy_share = shape(&by_device_groups, SeriesOrder::Encounter, None, |g| EnergyShare {
            device: g.key.clone(),
            energy: g.get("energy"),
            percentage: by_device_groups.share(g, "energy"),
        });

        let by_day = group_by(
            view.iter(),
            |r| Some(r.date),
            &[
                Measure::sum("energy", |r: &EnergyRow| Some(r.energy)),
                Measure::sum("production", |r: &EnergyRow| Some(r.production)),
            ],
        );
        let daily = shape(&by_day, SeriesOrder::KeyAsc, None, |g| DailyEnergy {
            date: g.key.format("%Y-%m-%d").to_string(),
            energy: g.get("energy"),
            production: g.get("production"),
        });

        EnergyReport {
            total_energy: total(view.iter(), |r| Some(r.energy)),
            average_energy_per_part: average(view.iter(), |r| Some(r.energy_per_part)),
            total_carbon: total(view.iter(), |r| Some(r.carbon)),
            most_efficient_device,
            by_device,
            daily,
            energy_share,
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

    fn raw(date: &str, device: &str, production: &str, energy: &str, per_part: &str) -> RawRecord {
        RawRecord::new()
            .with("date", date)
            .with("Device", device)
            .with("Actual Production", production)
            .with("Energy consumption", energy)
            .with("Average Energy per good part", per_part)
            .with("Carbon emission(0.716 g ofCO2/kWh)", "1.5")
    }

    fn dataset() -> Dataset<EnergyRow> {
        Dataset::from_raw(&[
            raw("2024-03-02", "M1", "100", "300", "3"),
            raw("2024-03-01", "M2", "50", "100", "2"),
            raw("2024-04-01", "", "10", "100", "0"),
            raw("2024-04-02", "M3", "", "50", "1"),
        ])
    }

    #[test]
    fn rows_need_production() {
        assert_eq!(dataset().len(), 3);
    }

    #[test]
    fn totals_and_blank_device_bucket() {
        let data = dataset();
        let report = Energy::compute(data.rows(), &EnergyFilters::default());
        assert_eq!(report.total_energy, 500.0);
        assert_eq!(report.total_carbon, 4.5);
        // zero readings still count toward the mean
        assert!((report.average_energy_per_part - 5.0 / 3.0).abs() < 1e-9);
        let devices: Vec<&str> = report.by_device.iter().map(|d| d.device.as_str()).collect();
        assert_eq!(devices, vec!["M1", "M2", UNKNOWN_DEVICE]);
        assert_eq!(report.energy_share[0].percentage, 60.0);
    }

    #[test]
    fn most_efficient_ignores_zero_readings() {
        let data = dataset();
        let report = Energy::compute(data.rows(), &EnergyFilters::default());
        assert_eq!(report.most_efficient_device.as_deref(), Some("M2"));
    }

    #[test]
    fn daily_series_is_chronological() {
        let data = dataset();
        let report = Energy::compute(data.rows(), &EnergyFilters::default());
        let days: Vec<&str> = report.daily.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(days, vec!["2024-03-01", "2024-03-02", "2024-04-01"]);
    }

    #[test]
    fn month_options_follow_the_calendar() {
        let data = dataset();
        let f = EnergyFilters {
            month: Some("Mar 2024".into()),
            ..Default::default()
        };
        let report = Energy::compute(data.rows(), &f);
        assert_eq!(report.options[1].values, vec!["Mar 2024", "Apr 2024"]);
        assert_eq!(report.total_energy, 400.0);
        assert_eq!(report.most_efficient_device.as_deref(), Some("M2"));
    }

    #[test]
    fn empty_view_has_no_efficient_device() {
        let data = dataset();
        let f = EnergyFilters {
            machine: Some("M9".into()),
            ..Default::default()
        };
        let report = Energy::compute(data.rows(), &f);
        assert_eq!(report.total_energy, 0.0);
        assert_eq!(report.average_energy_per_part, 0.0);
        assert!(report.most_efficient_device.is_none());
        assert!(report.energy_share.is_empty());
    }
}
