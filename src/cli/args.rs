//! CLI argument definitions using clap
//!
//! Commands:
//! - livequery query --config <path> [--user <name>]
//! - livequery explain --config <path>
//! - livequery tables --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Live query engine over a monitoring core snapshot
#[derive(Parser, Debug)]
#[command(name = "livequery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer one request read from stdin
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./livequery.json")]
        config: PathBuf,

        /// Run as this contact instead of any AuthUser header
        #[arg(long)]
        user: Option<String>,
    },

    /// Print the plan of one request read from stdin
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./livequery.json")]
        config: PathBuf,
    },

    /// List the table names and their column counts
    Tables {
        /// Path to configuration file
        #[arg(long, default_value = "./livequery.json")]
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_with_user() {
        let cli = Cli::try_parse_from([
            "livequery",
            "query",
            "--config",
            "/etc/lq.json",
            "--user",
            "alice",
        ])
        .unwrap();
        match cli.command {
            Command::Query { config, user } => {
                assert_eq!(config, PathBuf::from("/etc/lq.json"));
                assert_eq!(user.as_deref(), Some("alice"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["livequery", "explain"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Explain { config } if config == PathBuf::from("./livequery.json")
        ));
    }
}
