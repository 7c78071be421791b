//! Time Division Module
//! Merges per-division snapshots into one table and fits the two regressions.

use polars::prelude::*;
use std::collections::HashSet;
use thiserror::Error;

use crate::data::{any_value_to_f64, SourceError};
use crate::stats::{linear_fit, Regression, RegressionError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Mandatory source '{0}' is missing for division {1}")]
    MissingSource(&'static str, i32),
    #[error("Division {0} has not been merged yet")]
    NotMerged(i32),
    #[error("Division {0}: merged table has {1} rows, need at least 2 for regression")]
    TooFewRows(i32, usize),
    #[error("Regression error: {0}")]
    Regression(#[from] RegressionError),
}

/// Per-division snapshots, one slot per configured source.
///
/// The two axes and the point-size table are mandatory for a merge; the two
/// extra slots carry supplementary data and may be absent. A mandatory slot
/// holding `None` (division outside that source's range) is a configuration
/// error at merge time.
#[derive(Debug, Default, Clone)]
pub struct DivisionSources {
    pub axis_x: Option<DataFrame>,
    pub axis_y: Option<DataFrame>,
    pub size: Option<DataFrame>,
    pub extra_x: Option<DataFrame>,
    pub extra_y: Option<DataFrame>,
}

/// One division's worth of consolidated data and regression results.
#[derive(Debug, Clone)]
pub struct TimeDivision {
    division: i32,
    key_column: String,
    sources: DivisionSources,
    merged: Option<DataFrame>,
    fit_log: Option<Regression>,
    fit_linear: Option<Regression>,
}

impl TimeDivision {
    pub fn new(sources: DivisionSources, key_column: impl Into<String>, division: i32) -> Self {
        Self {
            division,
            key_column: key_column.into(),
            sources,
            merged: None,
            fit_log: None,
            fit_linear: None,
        }
    }

    pub fn division(&self) -> i32 {
        self.division
    }

    pub fn merged(&self) -> Option<&DataFrame> {
        self.merged.as_ref()
    }

    pub fn fit_log(&self) -> Option<&Regression> {
        self.fit_log.as_ref()
    }

    pub fn fit_linear(&self) -> Option<&Regression> {
        self.fit_linear.as_ref()
    }

    /// Consolidate the snapshots into one table.
    ///
    /// Rows survive the mandatory stage only when their key carries a usable
    /// value in axis_x, axis_y AND size; the completeness mask is applied to
    /// each mandatory table before any join. The tables are then inner-joined
    /// sequentially on the key column, extras included as supplied: an extra
    /// with sparse key coverage shrinks the result further.
    pub fn merge(&mut self) -> Result<(), PipelineError> {
        let axis_x = self
            .sources
            .axis_x
            .as_ref()
            .ok_or(PipelineError::MissingSource("axis_x", self.division))?;
        let axis_y = self
            .sources
            .axis_y
            .as_ref()
            .ok_or(PipelineError::MissingSource("axis_y", self.division))?;
        let size = self
            .sources
            .size
            .as_ref()
            .ok_or(PipelineError::MissingSource("size", self.division))?;

        let mut complete = complete_keys(axis_x, &self.key_column)?;
        complete = &complete & &complete_keys(axis_y, &self.key_column)?;
        complete = &complete & &complete_keys(size, &self.key_column)?;

        let mut merged = filter_by_keys(axis_x, &self.key_column, &complete)?;
        let mut others = vec![
            filter_by_keys(axis_y, &self.key_column, &complete)?,
            filter_by_keys(size, &self.key_column, &complete)?,
        ];
        if let Some(extra_x) = &self.sources.extra_x {
            others.push(extra_x.clone());
        }
        if let Some(extra_y) = &self.sources.extra_y {
            others.push(extra_y.clone());
        }

        for other in others {
            merged = merged
                .lazy()
                .join(
                    other.lazy(),
                    [col(self.key_column.as_str())],
                    [col(self.key_column.as_str())],
                    JoinArgs::new(JoinType::Inner),
                )
                .collect()?;
        }

        self.merged = Some(merged);
        Ok(())
    }

    /// Fit one regression over the merged table's value columns.
    ///
    /// Columns are taken by position: 0 is the key, 1 the independent
    /// variable, 2 the dependent one. With `log` the independent values are
    /// base-10 log-transformed first; non-positive values turn non-finite
    /// and flow into the fit as such.
    pub fn calculate_regression(&self, log: bool) -> Result<Regression, PipelineError> {
        let merged = self
            .merged
            .as_ref()
            .ok_or(PipelineError::NotMerged(self.division))?;
        if merged.height() < 2 {
            return Err(PipelineError::TooFewRows(self.division, merged.height()));
        }

        let columns = merged.get_columns();
        let mut x = column_to_f64(&columns[1])?;
        let y = column_to_f64(&columns[2])?;

        if log {
            for value in &mut x {
                *value = value.log10();
            }
        }

        Ok(linear_fit(&x, &y)?)
    }

    /// Compute and store both the log-scale and linear-scale regressions.
    pub fn regressions(&mut self) -> Result<(), PipelineError> {
        self.fit_log = Some(self.calculate_regression(true)?);
        self.fit_linear = Some(self.calculate_regression(false)?);
        Ok(())
    }
}

/// Keys whose value column (position 1) holds a usable number.
/// Null keys and null/NaN values count as incomplete.
fn complete_keys(df: &DataFrame, key_column: &str) -> Result<HashSet<String>, PolarsError> {
    let keys = df.column(key_column)?.str()?;
    let values = &df.get_columns()[1];

    let mut complete = HashSet::new();
    for i in 0..df.height() {
        let Some(key) = keys.get(i) else {
            continue;
        };
        let value = any_value_to_f64(&values.get(i)?);
        if !value.is_nan() {
            complete.insert(key.to_string());
        }
    }
    Ok(complete)
}

fn filter_by_keys(
    df: &DataFrame,
    key_column: &str,
    keep: &HashSet<String>,
) -> Result<DataFrame, PolarsError> {
    let keys = df.column(key_column)?.str()?;
    let mut mask = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        mask.push(keys.get(i).is_some_and(|key| keep.contains(key)));
    }
    df.filter(&BooleanChunked::from_slice("mask".into(), &mask))
}

fn column_to_f64(column: &Column) -> Result<Vec<f64>, PolarsError> {
    let casted = column.cast(&DataType::Float64)?;
    let ca = casted.f64()?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(name: &str, keys: &[&str], values: &[f64]) -> DataFrame {
        DataFrame::new(vec![
            Column::new("country".into(), keys.to_vec()),
            Column::new(name.into(), values.to_vec()),
        ])
        .unwrap()
    }

    fn mandatory_sources() -> DivisionSources {
        DivisionSources {
            axis_x: Some(snapshot("gdp", &["A", "B"], &[1.0, f64::NAN])),
            axis_y: Some(snapshot("life", &["A", "B"], &[2.0, 5.0])),
            size: Some(snapshot("pop", &["A", "B"], &[3.0, 6.0])),
            extra_x: None,
            extra_y: None,
        }
    }

    fn merged_keys(td: &TimeDivision) -> Vec<String> {
        let mut keys: Vec<String> = td
            .merged()
            .unwrap()
            .column("country")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .flatten()
            .map(|s| s.to_string())
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn incomplete_mandatory_rows_are_dropped() {
        let mut td = TimeDivision::new(mandatory_sources(), "country", 2000);
        td.merge().unwrap();

        // B has NaN gdp, so only A survives
        assert_eq!(merged_keys(&td), vec!["A"]);
        let merged = td.merged().unwrap();
        assert_eq!(merged.width(), 4);
        assert_eq!(
            merged.get_column_names()[0].as_str(),
            "country",
            "key column stays first"
        );
    }

    #[test]
    fn missing_mandatory_source_is_a_configuration_error() {
        let mut sources = mandatory_sources();
        sources.size = None;
        let mut td = TimeDivision::new(sources, "country", 2000);
        let err = td.merge().unwrap_err();
        assert!(matches!(err, PipelineError::MissingSource("size", 2000)));
    }

    #[test]
    fn sparse_extra_source_shrinks_the_result() {
        let mut sources = DivisionSources {
            axis_x: Some(snapshot("gdp", &["A", "B", "C"], &[1.0, 2.0, 3.0])),
            axis_y: Some(snapshot("life", &["A", "B", "C"], &[4.0, 5.0, 6.0])),
            size: Some(snapshot("pop", &["A", "B", "C"], &[7.0, 8.0, 9.0])),
            extra_x: Some(snapshot("gini", &["B"], &[0.4])),
            extra_y: None,
        };
        let mut td = TimeDivision::new(sources.clone(), "country", 2000);
        td.merge().unwrap();
        assert_eq!(merged_keys(&td), vec!["B"]);

        // extras are not completeness-filtered, only joined
        sources.extra_x = Some(snapshot("gini", &["A", "B", "C"], &[0.3, 0.4, f64::NAN]));
        let mut td = TimeDivision::new(sources, "country", 2000);
        td.merge().unwrap();
        assert_eq!(merged_keys(&td), vec!["A", "B", "C"]);
    }

    #[test]
    fn keys_with_quote_characters_survive_merge() {
        let keys = ["\"Korea, Rep.\"", "Cote d'Ivoire\""];
        let sources = DivisionSources {
            axis_x: Some(snapshot("gdp", &keys, &[1.0, 2.0])),
            axis_y: Some(snapshot("life", &keys, &[3.0, 4.0])),
            size: Some(snapshot("pop", &keys, &[5.0, 6.0])),
            extra_x: None,
            extra_y: None,
        };
        let mut td = TimeDivision::new(sources, "country", 2000);
        td.merge().unwrap();

        let mut expected: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        expected.sort();
        assert_eq!(merged_keys(&td), expected);
    }

    #[test]
    fn regression_requires_merge_first() {
        let td = TimeDivision::new(mandatory_sources(), "country", 2000);
        let err = td.calculate_regression(false).unwrap_err();
        assert!(matches!(err, PipelineError::NotMerged(2000)));
    }

    #[test]
    fn regression_rejects_single_row_merge() {
        let mut td = TimeDivision::new(mandatory_sources(), "country", 2000);
        td.merge().unwrap();
        let err = td.calculate_regression(false).unwrap_err();
        assert!(matches!(err, PipelineError::TooFewRows(2000, 1)));
    }

    #[test]
    fn linear_fit_over_merged_columns() {
        let sources = DivisionSources {
            axis_x: Some(snapshot("gdp", &["A", "B", "C"], &[1.0, 2.0, 3.0])),
            axis_y: Some(snapshot("life", &["A", "B", "C"], &[2.0, 4.0, 6.0])),
            size: Some(snapshot("pop", &["A", "B", "C"], &[1.0, 1.0, 1.0])),
            extra_x: None,
            extra_y: None,
        };
        let mut td = TimeDivision::new(sources, "country", 2000);
        td.merge().unwrap();
        td.regressions().unwrap();

        let lin = td.fit_linear().unwrap();
        assert!((lin.corr - 1.0).abs() < 1e-12);
        assert!(lin.p_value.abs() < 1e-12);
    }

    #[test]
    fn log_fit_recovers_log_linear_trend() {
        let sources = DivisionSources {
            axis_x: Some(snapshot("gdp", &["A", "B", "C"], &[1.0, 10.0, 100.0])),
            axis_y: Some(snapshot("life", &["A", "B", "C"], &[0.0, 1.0, 2.0])),
            size: Some(snapshot("pop", &["A", "B", "C"], &[1.0, 1.0, 1.0])),
            extra_x: None,
            extra_y: None,
        };
        let mut td = TimeDivision::new(sources, "country", 2000);
        td.merge().unwrap();

        let log_fit = td.calculate_regression(true).unwrap();
        assert!((log_fit.corr - 1.0).abs() < 1e-12);
    }
}
