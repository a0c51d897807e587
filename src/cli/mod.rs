//! Command-line interface
//!
//! - query: answer one request from stdin
//! - explain: print the plan of one request from stdin
//! - tables: list the registered tables

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    build_engine, execute_query, explain, load_config, query, run, run_command, table_listing,
    tables,
};
pub use config::Config;
pub use errors::{CliError, CliResult};
pub use io::{read_request, write_json, write_response};
