//! Query subsystem
//!
//! Request text is parsed into a [`Request`], resolved against a table
//! into a [`Query`], then driven once by the table's scan.
//!
//! # Errors
//!
//! Every client mistake (unknown table, column or operator, malformed
//! literal, unsupported operator for the column type, bad header) surfaces
//! as a [`QueryError`] before the scan starts. No partial output exists.

mod errors;
mod parser;
mod query;
mod sorter;

pub use errors::{QueryError, QueryResult};
pub use parser::{sniff_response_header, Header, Request};
pub use query::{
    Query, QueryLimits, QueryState, DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_REGEX_SIZE_LIMIT,
};
pub use sorter::{ResultSorter, SortDirection, SortableRow};
