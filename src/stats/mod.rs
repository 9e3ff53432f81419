//! Stats module - grouping, reduction and KPI summaries

mod descriptive;
mod grouping;
mod summary;

pub use descriptive::Descriptive;
pub use grouping::{group_by, GroupRecord, Grouped, Measure, Reducer};
pub use summary::{
    average, current_value, percent_change, percentage, ratio, total, CurrentValue, ValueSource,
};
