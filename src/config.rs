//! Configuration Module
//! Describes the datasets and division range for one analysis run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::data::{LoaderError, SourceTable};
use crate::pipeline::{CleaningRecipe, SourceSet};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config {0}: {1}")]
    Parse(PathBuf, #[source] serde_json::Error),
    #[error("Division range is empty: start {0} > stop {1}")]
    EmptyRange(i32, i32),
    #[error(transparent)]
    Loader(#[from] LoaderError),
}

/// One dataset slot: where to load it from and how to present and clean it.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub short_name: String,
    /// Metadata columns to drop before use (reference-styled exports).
    #[serde(default)]
    pub drop_columns: Vec<String>,
    /// Header holding this table's key, when it differs from the shared one.
    #[serde(default)]
    pub rename_key: Option<String>,
    /// Fuzzy-reconcile this table's keys against the axis-x keys.
    #[serde(default)]
    pub reconcile_keys: bool,
}

impl SourceConfig {
    fn plain(path: &str, short_name: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            short_name: short_name.to_string(),
            drop_columns: Vec::new(),
            rename_key: None,
            reconcile_keys: false,
        }
    }

    /// Recipe for the cleaning pass, or None when no step is configured.
    pub fn cleaning_recipe(&self) -> Option<CleaningRecipe> {
        if self.drop_columns.is_empty() && self.rename_key.is_none() && !self.reconcile_keys {
            return None;
        }
        Some(CleaningRecipe {
            drop_columns: self.drop_columns.clone(),
            rename_key: self.rename_key.clone(),
            reconcile: self.reconcile_keys,
        })
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DivisionRange {
    pub start: i32,
    pub stop: i32,
}

/// Full analysis configuration, deserializable from JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub key_column: String,
    pub divisions: DivisionRange,
    pub axis_x: SourceConfig,
    pub axis_y: SourceConfig,
    pub size: SourceConfig,
    #[serde(default)]
    pub extra_x: Option<SourceConfig>,
    #[serde(default)]
    pub extra_y: Option<SourceConfig>,
}

impl Default for AnalysisConfig {
    /// The gapminder study: life expectancy against PPP-adjusted GDP per
    /// capita, population as point size, Gini coefficient as extra.
    fn default() -> Self {
        Self {
            key_column: "country".to_string(),
            divisions: DivisionRange {
                start: 1800,
                stop: 2050,
            },
            axis_x: SourceConfig::plain(
                "data/gdppercapita_ppp_inflation_adjusted.csv",
                "GDP per capita inflation adjusted at PPP",
            ),
            axis_y: SourceConfig::plain("data/life_expectancy_years.csv", "life expectancy"),
            size: SourceConfig::plain("data/population_total.csv", "population"),
            extra_x: Some(SourceConfig {
                path: PathBuf::from("data/Gini_coefficient.csv"),
                short_name: "Gini coefficient".to_string(),
                drop_columns: vec![
                    "Country Code".to_string(),
                    "Indicator Name".to_string(),
                    "Indicator Code".to_string(),
                    "Unnamed: 68".to_string(),
                ],
                rename_key: Some("Country Name".to_string()),
                reconcile_keys: true,
            }),
            extra_y: None,
        }
    }
}

impl AnalysisConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.divisions.start > self.divisions.stop {
            return Err(ConfigError::EmptyRange(
                self.divisions.start,
                self.divisions.stop,
            ));
        }
        Ok(())
    }

    /// Load every configured dataset from disk.
    pub fn load_sources(&self) -> Result<SourceSet, ConfigError> {
        let load = |sc: &SourceConfig| SourceTable::from_csv(&sc.path, sc.short_name.as_str());

        Ok(SourceSet {
            axis_x: load(&self.axis_x)?,
            axis_y: load(&self.axis_y)?,
            size: load(&self.size)?,
            extra_x: self.extra_x.as_ref().map(&load).transpose()?,
            extra_y: self.extra_y.as_ref().map(&load).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_json() {
        let raw = r#"{
            "key_column": "country",
            "divisions": { "start": 2000, "stop": 2001 },
            "axis_x": { "path": "x.csv", "short_name": "x" },
            "axis_y": { "path": "y.csv", "short_name": "y" },
            "size": { "path": "s.csv", "short_name": "s" }
        }"#;
        let config: AnalysisConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.key_column, "country");
        assert!(config.extra_x.is_none());
        assert!(config.axis_x.cleaning_recipe().is_none());
        config.validate().unwrap();
    }

    #[test]
    fn rejects_empty_division_range() {
        let mut config = AnalysisConfig::default();
        config.divisions = DivisionRange {
            start: 2001,
            stop: 2000,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyRange(2001, 2000))
        ));
    }

    #[test]
    fn default_range_spans_the_full_study() {
        let config = AnalysisConfig::default();
        assert_eq!(config.divisions.start, 1800);
        assert_eq!(config.divisions.stop, 2050);
    }

    #[test]
    fn default_extra_requires_reconciliation() {
        let config = AnalysisConfig::default();
        let recipe = config.extra_x.unwrap().cleaning_recipe().unwrap();
        assert!(recipe.reconcile);
        assert_eq!(recipe.rename_key.as_deref(), Some("Country Name"));
        assert_eq!(recipe.drop_columns.len(), 4);
    }
}
