//! livequery CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. Errors go to
//! stderr with their code; the exit status distinguishes a written error
//! response (1) from a failure to answer at all (2).

use livequery::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}: {}", e.code(), e);
        std::process::exit(e.exit_code());
    }
}
