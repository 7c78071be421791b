//! Precompute Module
//! Orchestrates cleaning, per-division extraction, merging, and regression,
//! building the division cache consumed by the presentation layer.

use std::collections::BTreeMap;

use crate::data::{reconcile_keys, SourceTable, DEFAULT_MATCH_THRESHOLD};

use super::timediv::{DivisionSources, PipelineError, TimeDivision};

/// The five configured source tables. The two axes and the point-size table
/// are mandatory, the extras optional.
pub struct SourceSet {
    pub axis_x: SourceTable,
    pub axis_y: SourceTable,
    pub size: SourceTable,
    pub extra_x: Option<SourceTable>,
    pub extra_y: Option<SourceTable>,
}

/// Cleaning recipe for a reference-styled extra source (e.g. a World Bank
/// export): metadata columns to drop, the header naming its key column, and
/// whether its keys need fuzzy reconciliation against the axis-x keys.
#[derive(Debug, Clone, Default)]
pub struct CleaningRecipe {
    pub drop_columns: Vec<String>,
    pub rename_key: Option<String>,
    pub reconcile: bool,
}

/// Correlation and p-value series accumulated across divisions, in division
/// order: index `i` corresponds to `divisions[i]`.
#[derive(Debug, Clone, Default)]
pub struct TrendSeries {
    pub corr_log: Vec<f64>,
    pub pvalue_log: Vec<f64>,
    pub corr_lin: Vec<f64>,
    pub pvalue_lin: Vec<f64>,
}

impl TrendSeries {
    pub fn len(&self) -> usize {
        self.corr_log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corr_log.is_empty()
    }

    fn clear(&mut self) {
        self.corr_log.clear();
        self.pvalue_log.clear();
        self.corr_lin.clear();
        self.pvalue_lin.clear();
    }

    fn push(&mut self, td: &TimeDivision) {
        if let (Some(log), Some(lin)) = (td.fit_log(), td.fit_linear()) {
            self.corr_log.push(log.corr);
            self.pvalue_log.push(log.p_value);
            self.corr_lin.push(lin.corr);
            self.pvalue_lin.push(lin.p_value);
        }
    }
}

/// Owns the sources, the configured division range, and the precomputed
/// per-division cache. The cache is written once by `precompute` and is
/// read-only afterward.
pub struct Analyzer {
    sources: SourceSet,
    key_column: String,
    start: i32,
    stop: i32,
    cache: BTreeMap<i32, TimeDivision>,
    series: TrendSeries,
}

impl Analyzer {
    /// `start..=stop` is the inclusive division range to precompute.
    pub fn new(sources: SourceSet, key_column: impl Into<String>, start: i32, stop: i32) -> Self {
        Self {
            sources,
            key_column: key_column.into(),
            start,
            stop,
            cache: BTreeMap::new(),
            series: TrendSeries::default(),
        }
    }

    pub fn division_range(&self) -> (i32, i32) {
        (self.start, self.stop)
    }

    /// Precomputed record for one division, if it was in the configured range.
    pub fn division(&self, division: i32) -> Option<&TimeDivision> {
        self.cache.get(&division)
    }

    pub fn cache(&self) -> &BTreeMap<i32, TimeDivision> {
        &self.cache
    }

    pub fn series(&self) -> &TrendSeries {
        &self.series
    }

    /// Normalize the sources: sort the mandatory tables by key and apply the
    /// given recipes to the extras (drop metadata columns, rename the key
    /// header, fuzzy-reconcile keys against axis_x). Must run before
    /// `precompute`.
    pub fn clean_sources(
        &mut self,
        extra_x_recipe: Option<&CleaningRecipe>,
        extra_y_recipe: Option<&CleaningRecipe>,
    ) -> Result<(), PipelineError> {
        for table in [
            &mut self.sources.axis_x,
            &mut self.sources.axis_y,
            &mut self.sources.size,
        ] {
            table.sort_by_key(&self.key_column)?;
            table.mark_cleaned();
        }

        let reference = self.sources.axis_x.keys(&self.key_column)?;

        let extras = [
            (&mut self.sources.extra_x, extra_x_recipe),
            (&mut self.sources.extra_y, extra_y_recipe),
        ];
        for (slot, recipe) in extras {
            let Some(extra) = slot.as_mut() else {
                continue;
            };
            if let Some(recipe) = recipe {
                extra.drop_columns(&recipe.drop_columns)?;
                if let Some(from) = &recipe.rename_key {
                    extra.rename_column(from, &self.key_column)?;
                }
                if recipe.reconcile {
                    reconcile_keys(extra, &self.key_column, &reference, DEFAULT_MATCH_THRESHOLD)?;
                }
                extra.dedup_keys(&self.key_column)?;
                extra.sort_by_key(&self.key_column)?;
            }
            extra.mark_cleaned();
        }

        Ok(())
    }

    /// Build the division cache: for every division in ascending order,
    /// extract one snapshot per source, merge, fit both regressions, and
    /// append to the four trend series.
    ///
    /// Requires `clean_sources` to have run; a division not covered by all
    /// three mandatory sources aborts with a configuration error.
    pub fn precompute(&mut self) -> Result<(), PipelineError> {
        self.sources.axis_x.compute_division_range()?;
        self.sources.axis_y.compute_division_range()?;
        self.sources.size.compute_division_range()?;
        if let Some(extra) = self.sources.extra_x.as_mut() {
            extra.compute_division_range()?;
        }
        if let Some(extra) = self.sources.extra_y.as_mut() {
            extra.compute_division_range()?;
        }

        self.cache.clear();
        self.series.clear();

        for division in self.start..=self.stop {
            let sources = DivisionSources {
                axis_x: self
                    .sources
                    .axis_x
                    .extract_division(division, &self.key_column)?,
                axis_y: self
                    .sources
                    .axis_y
                    .extract_division(division, &self.key_column)?,
                size: self
                    .sources
                    .size
                    .extract_division(division, &self.key_column)?,
                extra_x: match &self.sources.extra_x {
                    Some(table) => table.extract_division(division, &self.key_column)?,
                    None => None,
                },
                extra_y: match &self.sources.extra_y {
                    Some(table) => table.extract_division(division, &self.key_column)?,
                    None => None,
                },
            };

            let mut td = TimeDivision::new(sources, self.key_column.as_str(), division);
            td.merge()?;
            td.regressions()?;

            self.series.push(&td);
            self.cache.insert(division, td);
        }

        log::info!(
            "precomputed {} divisions ({}..={})",
            self.cache.len(),
            self.start,
            self.stop
        );
        Ok(())
    }
}
