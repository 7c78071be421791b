//! Source Table Module
//! Wraps one loaded table: a key column plus one numeric column per division.

use polars::prelude::*;
use std::path::Path;
use thiserror::Error;

use super::convert::any_value_to_f64;
use super::loader::{self, LoaderError};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Source '{0}' has not been cleaned yet")]
    NotCleaned(String),
    #[error("Source '{0}': division range has not been computed")]
    RangeNotComputed(String),
    #[error("Source '{0}' has no division columns")]
    NoDivisionColumns(String),
    #[error("Source '{0}': column header '{1}' is not an integer division label")]
    BadDivisionLabel(String, String),
}

/// One tabular source: a textual key column (first position) and one value
/// column per division, with headers that read as ascending integers.
///
/// Core operations require the table to be cleaned first; cleaning is a
/// one-time normalization (sort, dedup, key reconciliation) driven by the
/// surrounding layer.
pub struct SourceTable {
    df: DataFrame,
    data_name: String,
    short_name: String,
    cleaned: bool,
    first_division: Option<i32>,
    last_division: Option<i32>,
}

impl SourceTable {
    pub fn new(
        df: DataFrame,
        data_name: impl Into<String>,
        short_name: impl Into<String>,
    ) -> Self {
        Self {
            df,
            data_name: data_name.into(),
            short_name: short_name.into(),
            cleaned: false,
            first_division: None,
            last_division: None,
        }
    }

    /// Load a source from a CSV file. The data name (used to label the
    /// extracted value column) is derived from the file stem.
    pub fn from_csv(file_path: &Path, short_name: impl Into<String>) -> Result<Self, LoaderError> {
        let df = loader::load_csv(file_path)?;
        let data_name = loader::data_name_from_path(file_path);
        Ok(Self::new(df, data_name, short_name))
    }

    pub fn data_name(&self) -> &str {
        &self.data_name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn is_cleaned(&self) -> bool {
        self.cleaned
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// Mark the table as cleaned. Call after the normalization steps below.
    pub fn mark_cleaned(&mut self) {
        self.cleaned = true;
    }

    /// Sort rows by the key column.
    pub fn sort_by_key(&mut self, key_column: &str) -> Result<(), SourceError> {
        self.df = self.df.sort([key_column], SortMultipleOptions::default())?;
        Ok(())
    }

    /// Drop duplicate keys, keeping the first occurrence.
    pub fn dedup_keys(&mut self, key_column: &str) -> Result<(), SourceError> {
        let keys = self.df.column(key_column)?.str()?;
        let mut seen = std::collections::HashSet::new();
        let mut keep = Vec::with_capacity(keys.len());
        for i in 0..keys.len() {
            let key = keys.get(i).unwrap_or_default();
            keep.push(seen.insert(key.to_string()));
        }
        let mask = BooleanChunked::from_slice("mask".into(), &keep);
        self.df = self.df.filter(&mask)?;
        Ok(())
    }

    /// Drop the named columns if present (missing names are ignored).
    pub fn drop_columns(&mut self, names: &[String]) -> Result<(), SourceError> {
        for name in names {
            let exists = self
                .df
                .get_column_names()
                .iter()
                .any(|c| c.as_str() == name);
            if exists {
                self.df = self.df.drop(name)?;
            }
        }
        Ok(())
    }

    /// Rename a column, typically the source's own key header to the
    /// shared key column name.
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<(), SourceError> {
        self.df.rename(from, to.into())?;
        Ok(())
    }

    /// Replace the key column with the given values and drop rows whose
    /// replacement is None. Used by fuzzy key reconciliation.
    pub fn replace_keys(
        &mut self,
        key_column: &str,
        new_keys: Vec<Option<String>>,
    ) -> Result<(), SourceError> {
        let keep: Vec<bool> = new_keys.iter().map(|k| k.is_some()).collect();
        let keys = Column::new(key_column.into(), new_keys);
        self.df.replace(key_column, keys.take_materialized_series())?;
        let mask = BooleanChunked::from_slice("mask".into(), &keep);
        self.df = self.df.filter(&mask)?;
        Ok(())
    }

    /// Collect the key column as strings, skipping nulls.
    pub fn keys(&self, key_column: &str) -> Result<Vec<String>, SourceError> {
        let col = self.df.column(key_column)?.str()?;
        Ok(col.into_iter().flatten().map(str::to_string).collect())
    }

    /// Parse the first and last division column headers as integers.
    /// Requires the table to be cleaned first.
    pub fn compute_division_range(&mut self) -> Result<(), SourceError> {
        if !self.cleaned {
            return Err(SourceError::NotCleaned(self.short_name.clone()));
        }

        let names = self.df.get_column_names();
        if names.len() < 2 {
            return Err(SourceError::NoDivisionColumns(self.short_name.clone()));
        }

        let parse = |name: &str| {
            name.parse::<i32>().map_err(|_| {
                SourceError::BadDivisionLabel(self.short_name.clone(), name.to_string())
            })
        };

        self.first_division = Some(parse(names[1].as_str())?);
        self.last_division = Some(parse(names[names.len() - 1].as_str())?);
        Ok(())
    }

    /// Inclusive division range covered by this table.
    pub fn division_range(&self) -> Result<(i32, i32), SourceError> {
        match (self.first_division, self.last_division) {
            (Some(first), Some(last)) => Ok((first, last)),
            _ => Err(SourceError::RangeNotComputed(self.short_name.clone())),
        }
    }

    /// Extract the two-column (key, value) snapshot for one division.
    ///
    /// The division's column is renamed to this source's data name and every
    /// cell is numeric-normalized (suffixed strings parsed, failures -> NaN).
    /// Returns `Ok(None)` when the division lies outside the covered range:
    /// "not applicable", not an error.
    pub fn extract_division(
        &self,
        division: i32,
        key_column: &str,
    ) -> Result<Option<DataFrame>, SourceError> {
        if !self.cleaned {
            return Err(SourceError::NotCleaned(self.short_name.clone()));
        }
        let (first, last) = self.division_range()?;
        if division < first || division > last {
            return Ok(None);
        }

        let key = self.df.column(key_column)?.clone();
        let raw = self.df.column(&division.to_string())?;

        let mut values = Vec::with_capacity(raw.len());
        for i in 0..raw.len() {
            let value = raw
                .get(i)
                .map(|v| any_value_to_f64(&v))
                .unwrap_or(f64::NAN);
            values.push(value);
        }

        let snapshot = DataFrame::new(vec![
            key,
            Column::new(self.data_name.as_str().into(), values),
        ])?;

        Ok(Some(snapshot))
    }
}
