//! stdin/stdout handling
//!
//! - Input: one request text, up to EOF
//! - Output: the framed response bytes, or pretty JSON for explain

use std::io::{self, Read, Write};

use serde_json::Value;

use crate::output::Response;

use super::errors::{CliError, CliResult};

/// Read one request from stdin
pub fn read_request() -> CliResult<String> {
    let mut text = String::new();
    io::stdin().lock().read_to_string(&mut text)?;
    if text.trim().is_empty() {
        return Err(CliError::EmptyInput);
    }
    Ok(text)
}

pub fn write_response(response: &Response) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(&response.to_bytes())?;
    stdout.flush()?;
    Ok(())
}

pub fn write_json(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).map_err(io::Error::from)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
