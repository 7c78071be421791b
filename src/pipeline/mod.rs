//! Pipeline module - per-division merging, regression, and the precompute cache

mod precompute;
mod timediv;

pub use precompute::{Analyzer, CleaningRecipe, SourceSet, TrendSeries};
pub use timediv::{DivisionSources, PipelineError, TimeDivision};
