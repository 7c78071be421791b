//! Stats module - regression fitting

mod regression;

pub use regression::{linear_fit, Regression, RegressionError};
