//! opsdash - CSV aggregation pipeline for manufacturing and supply-chain dashboards
//!
//! Raw CSV rows are normalized into typed records, narrowed by cascading filters,
//! grouped and reduced, then shaped into chart-ready series and KPI summaries.

pub mod calendar;
pub mod charts;
pub mod config;
pub mod dashboards;
pub mod data;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod stats;

pub use error::{DashboardError, Result};
