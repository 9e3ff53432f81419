//! CSV Data Loader Module
//! Reads a dashboard extract with Polars and hands it over as raw string records.

use crate::data::record::RawRecord;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("CSV file not found: {0}")]
    NotFound(PathBuf),
    #[error("No data loaded")]
    NoData,
}

/// Handles CSV file loading with Polars.
///
/// Every column is read as text; typing happens later in the normalizer so that
/// a malformed cell never aborts the whole load.
#[derive(Default)]
pub struct CsvLoader {
    df: Option<DataFrame>,
    file_path: Option<PathBuf>,
}

impl CsvLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a CSV file using Polars.
    pub fn load_csv(&mut self, file_path: &Path) -> Result<&DataFrame, LoaderError> {
        if !file_path.is_file() {
            return Err(LoaderError::NotFound(file_path.to_path_buf()));
        }
        self.file_path = Some(file_path.to_path_buf());

        // Schema inference disabled: all columns come back as strings
        let df = LazyCsvReader::new(file_path)
            .with_infer_schema_length(Some(0))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;

        info!(
            path = %file_path.display(),
            rows = df.height(),
            columns = df.width(),
            "loaded csv"
        );
        self.df = Some(df);
        self.df.as_ref().ok_or(LoaderError::NoData)
    }

    /// Get list of column names from loaded DataFrame.
    pub fn get_columns(&self) -> Vec<String> {
        self.df
            .as_ref()
            .map(|df| {
                df.get_column_names()
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get the number of rows in the DataFrame.
    pub fn get_row_count(&self) -> usize {
        self.df.as_ref().map(|df| df.height()).unwrap_or(0)
    }

    pub fn get_file_path(&self) -> Option<&PathBuf> {
        self.file_path.as_ref()
    }

    /// Convert the loaded frame into row-wise raw records. Null cells are left out.
    pub fn to_raw_records(&self) -> Result<Vec<RawRecord>, LoaderError> {
        let df = self.df.as_ref().ok_or(LoaderError::NoData)?;
        let mut rows = vec![RawRecord::new(); df.height()];

        for column in df.get_columns() {
            let name = column.name().to_string();
            let values = column.as_materialized_series().str()?;
            for (row, value) in rows.iter_mut().zip(values.into_iter()) {
                if let Some(value) = value {
                    row.insert(name.clone(), value);
                }
            }
        }

        Ok(rows)
    }

    /// One-shot load: read `path` and return its raw records.
    pub fn read_raw_records(path: &Path) -> Result<Vec<RawRecord>, LoaderError> {
        let mut loader = Self::new();
        loader.load_csv(path)?;
        loader.to_raw_records()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_every_column_as_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Customer,Sales,Financial Year").unwrap();
        writeln!(file, "X,100,2023").unwrap();
        writeln!(file, "Y,,2023").unwrap();
        file.flush().unwrap();

        let mut loader = CsvLoader::new();
        loader.load_csv(file.path()).unwrap();
        assert_eq!(loader.get_row_count(), 2);
        assert_eq!(loader.get_columns(), vec!["Customer", "Sales", "Financial Year"]);

        let rows = loader.to_raw_records().unwrap();
        assert_eq!(rows[0].get("Sales"), Some("100"));
        assert_eq!(rows[0].get("Financial Year"), Some("2023"));
        assert_eq!(rows[1].get("Customer"), Some("Y"));
        assert_eq!(rows[1].get("Sales"), None);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = CsvLoader::read_raw_records(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }

    #[test]
    fn records_before_load_is_an_error() {
        assert!(matches!(
            CsvLoader::new().to_raw_records(),
            Err(LoaderError::NoData)
        ));
    }
}
