//! Engine errors.
//!
//! Malformed individual records are not errors: they are skipped with a
//! warning so one bad entity or pattern never aborts a run. The only hard
//! failure is a configuration the scorer cannot interpret.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid configuration: threshold `{name}` must be finite and non-negative (got {value})")]
    InvalidThreshold { name: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
