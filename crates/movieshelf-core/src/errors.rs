use serde::Serialize;
use thiserror::Error;

/// Rejected request input. Raised before any store call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{param} must be an integer, got {value:?}")]
    InvalidInteger { param: &'static str, value: String },
    #[error("invalid {param} {value:?}, expected yyyy-yyyy")]
    InvalidRangeFormat { param: &'static str, value: String },
    #[error("{param} must have exactly {expected} values for a range, got {got}")]
    InvalidArity {
        param: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{param} must be a numeric id, got {value:?}")]
    InvalidId { param: &'static str, value: String },
    #[error("missing parameter: {0}")]
    Missing(&'static str),
    #[error("malformed query string: {0}")]
    MalformedQuery(String),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("invalid request: {0}")]
    Invalid(#[from] ValidationError),
    #[error("movie not found")]
    NotFound,
    #[error("upstream error: {0}")]
    Upstream(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Upstream,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Upstream => "upstream",
        }
    }
}

impl CatalogError {
    pub fn upstream(e: impl std::fmt::Display) -> Self {
        CatalogError::Upstream(e.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Invalid(_) => ErrorKind::Validation,
            CatalogError::NotFound => ErrorKind::NotFound,
            CatalogError::Upstream(_) => ErrorKind::Upstream,
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
