//! Data module - CSV loading and row normalization

mod loader;
mod normalizer;
mod record;

pub use loader::{CsvLoader, LoaderError};
pub use normalizer::{
    parse_number, Exclusion, ExclusionCount, ExclusionReason, FieldKind, FieldSpec, NormalizeReport,
    Normalized, NumberPolicy, Schema,
};
pub use record::{NormalizedRecord, RawRecord, Value};
