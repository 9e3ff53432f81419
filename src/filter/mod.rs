//! Filter module - cascading filter chains and selection state

mod cascade;
mod selection;

pub use cascade::{
    numeric_cmp, FieldOptions, FilterChain, FilterField, FilterOutcome, FilterSpec, OptionOrder,
};
pub use selection::{is_all_sentinel, MultiSelect, Selection};
