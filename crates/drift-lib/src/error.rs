//! Error taxonomy for the recommendation engine
//!
//! Only structural and configuration problems surface as errors. Numeric
//! trouble (infeasible solves, degenerate solutions, too little data) is
//! recovered inside the engine and reported through tagged values instead.

use thiserror::Error;

/// Fatal errors raised by `compute`
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecommendError {
    /// The input series is empty or holds no usable value after curation
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The configured forecast model is not implemented
    #[error("unsupported forecast model: {0}")]
    UnsupportedForecastModel(String),

    /// A configuration value is outside its domain
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RecommendError>;
