//! timecorr - per-division dataset merging and correlation analysis
//!
//! Loads several tabular datasets indexed by a shared key column and one
//! column per time division, merges them division by division, and fits
//! linear and log-linear regressions between the two axis variables. The
//! result is a precomputed per-division cache plus correlation/p-value
//! trend series, ready for interactive lookup by a presentation layer.

pub mod config;
pub mod data;
pub mod pipeline;
pub mod stats;
