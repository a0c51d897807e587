//! CLI error types
//!
//! Error codes:
//! - LQ_CLI_CONFIG_ERROR
//! - LQ_CLI_IO_ERROR
//! - LQ_CLI_EMPTY_INPUT
//! - LQ_CLI_QUERY_FAILED
//! - core and query codes pass through unchanged

use std::io;

use thiserror::Error;

use crate::core::CoreError;
use crate::query::QueryError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no request on stdin")]
    EmptyInput,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Query(#[from] QueryError),

    /// The response was written; it carried this error status
    #[error("query answered with status {0}")]
    QueryFailed(u16),
}

impl CliError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        CliError::Config(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "LQ_CLI_CONFIG_ERROR",
            CliError::Io(_) => "LQ_CLI_IO_ERROR",
            CliError::EmptyInput => "LQ_CLI_EMPTY_INPUT",
            CliError::Core(err) => err.code(),
            CliError::Query(err) => err.code(),
            CliError::QueryFailed(_) => "LQ_CLI_QUERY_FAILED",
        }
    }

    /// Process exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::QueryFailed(_) => 1,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(CliError::config_error("x").code(), "LQ_CLI_CONFIG_ERROR");
        assert_eq!(CliError::from(CoreError::LockTimeout(10)).code(), "LQ_CORE_LOCK_TIMEOUT");
        assert_eq!(
            CliError::from(QueryError::UnknownTable("x".into())).code(),
            QueryError::UnknownTable("x".into()).code()
        );
        assert_eq!(CliError::QueryFailed(404).exit_code(), 1);
        assert_eq!(CliError::EmptyInput.exit_code(), 2);
    }
}
