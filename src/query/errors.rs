//! Query error types
//!
//! Error codes:
//! - LQ_QUERY_UNKNOWN_TABLE (404)
//! - LQ_QUERY_UNKNOWN_COLUMN (400)
//! - LQ_QUERY_UNKNOWN_OPERATOR (400)
//! - LQ_QUERY_MALFORMED_LITERAL (400)
//! - LQ_QUERY_TYPE_MISMATCH (400)
//! - LQ_QUERY_INVALID_HEADER (400)
//! - LQ_QUERY_INVALID_REGEX (400)
//! - LQ_QUERY_RESPONSE_TOO_LARGE (413)
//! - LQ_QUERY_INVALID_STATE (500)
//! - core errors pass through with their own code (503 when transient)

use thiserror::Error;

use crate::column::ColumnType;
use crate::core::CoreError;

/// Result type for query construction and evaluation
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while parsing, building or answering a query
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },

    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("malformed {expected} literal '{literal}'")]
    MalformedLiteral { expected: &'static str, literal: String },

    #[error("operator '{operator}' not supported on {column_type} column '{column}'")]
    TypeMismatch {
        column: String,
        column_type: ColumnType,
        operator: String,
    },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid regular expression '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("response of {size} bytes exceeds limit of {limit} bytes")]
    ResponseTooLarge { size: usize, limit: usize },

    #[error("invalid query state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl QueryError {
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn malformed(expected: &'static str, literal: impl Into<String>) -> Self {
        Self::MalformedLiteral {
            expected,
            literal: literal.into(),
        }
    }

    pub fn invalid_header(msg: impl Into<String>) -> Self {
        Self::InvalidHeader(msg.into())
    }

    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownTable(_) => "LQ_QUERY_UNKNOWN_TABLE",
            Self::UnknownColumn { .. } => "LQ_QUERY_UNKNOWN_COLUMN",
            Self::UnknownOperator(_) => "LQ_QUERY_UNKNOWN_OPERATOR",
            Self::MalformedLiteral { .. } => "LQ_QUERY_MALFORMED_LITERAL",
            Self::TypeMismatch { .. } => "LQ_QUERY_TYPE_MISMATCH",
            Self::InvalidHeader(_) => "LQ_QUERY_INVALID_HEADER",
            Self::InvalidRegex { .. } => "LQ_QUERY_INVALID_REGEX",
            Self::ResponseTooLarge { .. } => "LQ_QUERY_RESPONSE_TOO_LARGE",
            Self::InvalidState { .. } => "LQ_QUERY_INVALID_STATE",
            Self::Core(err) => err.code(),
        }
    }

    /// Wire status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownTable(_) => 404,
            Self::ResponseTooLarge { .. } => 413,
            Self::InvalidState { .. } => 500,
            Self::Core(err) if err.is_transient() => 503,
            Self::Core(_) => 500,
            _ => 400,
        }
    }

    /// Parse errors are raised before any row is scanned
    pub fn is_parse_error(&self) -> bool {
        self.status_code() == 400 || matches!(self, Self::UnknownTable(_))
    }

    /// Only core lock/availability failures may be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Core(err) if err.is_transient())
    }
}
