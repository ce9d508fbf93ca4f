//! Error types for rule compilation.
//!
//! Every variant names the offending field and value so a dropped condition
//! can be reported back to whoever wrote the rule.

use thiserror::Error;

/// Reasons a single condition cannot be compiled
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("Unknown field '{field}'")]
    UnknownField { field: String },

    #[error("Unknown operator '{operator}' on field '{field}'")]
    UnknownOperator { field: String, operator: String },

    #[error("Operator '{operator}' cannot be applied to field '{field}'")]
    UnsupportedOperator { field: String, operator: String },

    #[error("Field '{field}' expects a number but got '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("Field '{field}' expects true/false but got '{value}'")]
    InvalidBoolean { field: String, value: String },

    #[error("Field '{field}' expects a date (YYYY-MM-DD or RFC 3339) but got '{value}'")]
    InvalidDate { field: String, value: String },

    #[error("Field '{field}' expects a relative age like '30:days' but got '{value}'")]
    InvalidRelativeDate { field: String, value: String },

    #[error("Field '{field}' has an empty value list")]
    EmptyValueList { field: String },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, RuleError>;
