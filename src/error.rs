use crate::data::LoaderError;
use thiserror::Error;

/// Failures at the dashboard boundary. The aggregation pipeline itself never fails;
/// these only arise from naming, option parsing and data acquisition.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Unknown dashboard: {0}")]
    UnknownDashboard(String),

    #[error("Invalid filter options: {0}")]
    InvalidFilters(#[source] serde_json::Error),

    #[error("Failed to serialize dashboard output: {0}")]
    Output(#[source] serde_json::Error),

    #[error("Data unavailable: {0}")]
    DataUnavailable(#[from] LoaderError),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
