//! HTTP server for the tournament bracket engine.
//!
//! Wraps [`bracket_engine`]'s stage manager and pipeline orchestrator in an
//! axum router, with env/CLI configuration, structured logging and Prometheus
//! metrics. The binary in `main.rs` wires these together.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
