//! CLI command implementations
//!
//! Each command loads the configuration, builds an [`Engine`] over the
//! configured snapshot and answers exactly one request.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::auth::ContactUser;
use crate::core::{Core, MemoryCore, Snapshot};
use crate::engine::Engine;
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::output::Response;
use crate::table::TableRegistry;

use super::args::{Cli, Command};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_json, write_response};

/// Main CLI entry point, the only function main.rs calls
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Query { config, user } => query(&config, user.as_deref()),
        Command::Explain { config } => explain(&config),
        Command::Tables { config } => tables(&config),
    }
}

/// Loads the configuration and applies its log level
pub fn load_config(config_path: &Path) -> CliResult<Config> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.severity());
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("path", config_path.display().to_string().as_str()),
            ("log_level", config.log_level.as_str()),
            ("lock_timeout_ms", config.lock_timeout_ms.to_string().as_str()),
        ],
    );
    Ok(config)
}

/// Loads the snapshot and registers every table over it
pub fn build_engine(config: &Config) -> CliResult<Engine> {
    let snapshot = Snapshot::load(&config.snapshot_path)?;
    let core = MemoryCore::from_snapshot(snapshot, config.lock_timeout())?;
    {
        let state = core.read_state()?;
        log_event_with_fields(
            Event::SnapshotLoaded,
            &[
                ("path", config.snapshot_path.display().to_string().as_str()),
                ("hosts", state.num_hosts().to_string().as_str()),
                ("services", state.num_services().to_string().as_str()),
            ],
        );
    }

    let registry = TableRegistry::new(Arc::new(core));
    Ok(Engine::new(registry, config.limits())
        .with_service_authorization(config.service_authorization))
}

/// Answers `text`. `user` overrides the request's `AuthUser:` header.
pub fn execute_query(engine: &Engine, config: &Config, text: &str, user: Option<&str>) -> Response {
    match user {
        Some(name) => {
            let contact =
                ContactUser::new(name).with_service_authorization(config.service_authorization);
            engine.execute(text, &contact)
        }
        None => engine.handle(text),
    }
}

/// Answer one request from stdin
///
/// The response is written even when it carries an error status; the
/// command then fails with [`CliError::QueryFailed`].
pub fn query(config_path: &Path, user: Option<&str>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = build_engine(&config)?;
    let text = read_request()?;

    let response = execute_query(&engine, &config, &text, user);
    write_response(&response)?;
    log_metrics(&engine);
    if response.is_ok() {
        Ok(())
    } else {
        Err(CliError::QueryFailed(response.status))
    }
}

/// Print the plan of one request from stdin
pub fn explain(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = build_engine(&config)?;
    let text = read_request()?;
    let plan = engine.explain(&text);
    log_metrics(&engine);
    write_json(&plan?)
}

fn log_metrics(engine: &Engine) {
    let metrics = engine.metrics().to_json();
    log_event_with_fields(Event::EngineMetrics, &[("metrics", metrics.as_str())]);
}

pub fn table_listing(engine: &Engine) -> Value {
    let registry = engine.registry();
    let tables: Vec<Value> = registry
        .names()
        .filter_map(|name| registry.get(name).ok())
        .map(|table| {
            json!({
                "name": table.name(),
                "prefix": table.name_prefix(),
                "columns": table.columns().len(),
                "indexed": table.indexed_columns(),
            })
        })
        .collect();
    json!({ "tables": tables })
}

pub fn tables(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = build_engine(&config)?;
    write_json(&table_listing(&engine))
}
