//! livequery - live query engine over monitoring core state
//!
//! Requests in the line-based `GET <table>` language are answered against
//! virtual tables whose rows are borrowed from the core under its state
//! lock, filtered, optionally aggregated, and rendered as CSV, JSON or
//! Python literals.

pub mod auth;
pub mod cli;
pub mod column;
pub mod core;
pub mod engine;
pub mod filter;
pub mod observability;
pub mod output;
pub mod query;
pub mod stats;
pub mod table;

pub use engine::Engine;
