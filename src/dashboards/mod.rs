//! Dashboards module - one aggregation per operations page, plus a name-based registry

mod alarms;
mod capacity;
mod downtime;
mod energy;
mod forecast;
mod inventory;
mod lifecycle;
mod maintenance;
mod oee;
mod po_status;
mod water;

pub use alarms::{AlarmFilters, AlarmReport, AlarmRow, Alarms};
pub use capacity::{Capacity, CapacityFilters, CapacityReport, CapacityRow};
pub use downtime::{Downtime, DowntimeFilters, DowntimeReport, DowntimeRow};
pub use energy::{Energy, EnergyFilters, EnergyReport, EnergyRow};
pub use forecast::{Forecast, ForecastFilters, ForecastReport, ForecastRow};
pub use inventory::{Inventory, InventoryFilters, InventoryReport, InventoryRow};
pub use lifecycle::{
    Lifecycle, LifecycleFilters, LifecycleReport, LifecycleRow, ALL_CUSTOMERS, ALL_YEARS,
};
pub use maintenance::{
    Maintenance, MaintenanceFilters, MaintenanceReport, MaintenanceRow, Parameter, PARAMETERS,
};
pub use oee::{Oee, OeeFilters, OeeReport, OeeRow};
pub use po_status::{PoFilters, PoReport, PoRow, PoStatus};
pub use water::{Water, WaterFilters, WaterReport, WaterRow};

use crate::data::{CsvLoader, NormalizeReport, RawRecord};
use crate::error::{DashboardError, Result};
use crate::pipeline::{Dashboard, Session, TypedRow};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Registered dashboard names, in menu order.
pub const DASHBOARDS: [&str; 11] = [
    Lifecycle::NAME,
    Inventory::NAME,
    PoStatus::NAME,
    Oee::NAME,
    Energy::NAME,
    Alarms::NAME,
    Downtime::NAME,
    Forecast::NAME,
    Water::NAME,
    Maintenance::NAME,
    Capacity::NAME,
];

/// Column layout a dashboard expects from its extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardInfo {
    pub name: &'static str,
    pub required_columns: Vec<&'static str>,
    pub optional_columns: Vec<&'static str>,
}

fn info_of<D: Dashboard>() -> DashboardInfo {
    let schema = D::Row::schema();
    DashboardInfo {
        name: D::NAME,
        required_columns: schema.required_columns(),
        optional_columns: schema.optional_columns(),
    }
}

pub fn catalog() -> Vec<DashboardInfo> {
    vec![
        info_of::<Lifecycle>(),
        info_of::<Inventory>(),
        info_of::<PoStatus>(),
        info_of::<Oee>(),
        info_of::<Energy>(),
        info_of::<Alarms>(),
        info_of::<Downtime>(),
        info_of::<Forecast>(),
        info_of::<Water>(),
        info_of::<Maintenance>(),
        info_of::<Capacity>(),
    ]
}

/// Envelope written for every run.
#[derive(Debug, Serialize)]
struct RunOutput<'a, O> {
    dashboard: &'static str,
    normalization: &'a NormalizeReport,
    report: O,
}

fn run<D: Dashboard>(raw: &[RawRecord], filters: Value) -> Result<Value> {
    let filters: D::Filters = if filters.is_null() {
        D::Filters::default()
    } else {
        serde_json::from_value(filters).map_err(DashboardError::InvalidFilters)?
    };

    let mut session = Session::<D>::from_raw(raw);
    let report = session.apply(&filters);
    info!(
        dashboard = D::NAME,
        rows = session.data().len(),
        excluded = session.data().report().excluded_rows(),
        "dashboard computed"
    );

    serde_json::to_value(RunOutput {
        dashboard: D::NAME,
        normalization: session.data().report(),
        report,
    })
    .map_err(DashboardError::Output)
}

/// Compute the dashboard called `name` over `raw`. `filters` is the JSON options
/// object for that dashboard; `null` or missing keys mean "All".
pub fn run_by_name(name: &str, raw: &[RawRecord], filters: Value) -> Result<Value> {
    match name {
        Lifecycle::NAME => run::<Lifecycle>(raw, filters),
        Inventory::NAME => run::<Inventory>(raw, filters),
        PoStatus::NAME => run::<PoStatus>(raw, filters),
        Oee::NAME => run::<Oee>(raw, filters),
        Energy::NAME => run::<Energy>(raw, filters),
        Alarms::NAME => run::<Alarms>(raw, filters),
        Downtime::NAME => run::<Downtime>(raw, filters),
        Forecast::NAME => run::<Forecast>(raw, filters),
        Water::NAME => run::<Water>(raw, filters),
        Maintenance::NAME => run::<Maintenance>(raw, filters),
        Capacity::NAME => run::<Capacity>(raw, filters),
        other => Err(DashboardError::UnknownDashboard(other.to_string())),
    }
}

/// Load the CSV at `path` and compute dashboard `name` over it.
pub fn run_csv(name: &str, path: &Path, filters: Value) -> Result<Value> {
    if !DASHBOARDS.contains(&name) {
        return Err(DashboardError::UnknownDashboard(name.to_string()));
    }
    let raw = CsvLoader::read_raw_records(path)?;
    run_by_name(name, &raw, filters)
}

/// File name `run-all` looks for in the data directory.
pub fn default_csv(name: &str) -> String {
    format!("{name}.csv")
}
