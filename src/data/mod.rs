//! Data module - CSV loading, value normalization, and source tables

mod convert;
mod loader;
mod reconcile;
mod source;

pub use convert::{any_value_to_f64, format_magnitude, parse_suffixed_number};
pub use loader::{data_name_from_path, load_csv, LoaderError};
pub use reconcile::{best_match, reconcile_keys, DEFAULT_MATCH_THRESHOLD};
pub use source::{SourceError, SourceTable};
