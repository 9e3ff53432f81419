//! Charts module - chart-ready series

mod series;

pub use series::{shape, SeriesOrder};
