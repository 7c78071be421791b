//! CSV Data Loader Module
//! Handles CSV file loading for source tables using Polars.

use polars::prelude::*;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Loaded table is empty: {0}")]
    EmptyTable(String),
}

/// Load a CSV file into a DataFrame.
///
/// The first column is expected to hold the shared key (e.g. country), the
/// remaining headers are division labels (e.g. years). Values keep their
/// inferred dtypes; suffixed strings are normalized later, at extraction.
pub fn load_csv(file_path: &Path) -> Result<DataFrame, LoaderError> {
    // Use lazy evaluation for memory efficiency, then collect
    let df = LazyCsvReader::new(file_path)
        .with_infer_schema_length(Some(10000))
        .with_ignore_errors(true)
        .finish()?
        .collect()?;

    if df.height() == 0 {
        return Err(LoaderError::EmptyTable(file_path.display().to_string()));
    }

    log::debug!(
        "loaded {} ({} rows, {} columns)",
        file_path.display(),
        df.height(),
        df.width()
    );

    Ok(df)
}

/// Derive a data name from a file path: the stem with underscores
/// replaced by spaces ("life_expectancy_years.csv" -> "life expectancy years").
pub fn data_name_from_path(file_path: &Path) -> String {
    file_path
        .file_stem()
        .map(|s| s.to_string_lossy().replace('_', " "))
        .unwrap_or_else(|| file_path.display().to_string())
}
