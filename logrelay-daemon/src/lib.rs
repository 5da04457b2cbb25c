//! logrelay daemon library.
//!
//! This library exposes internal modules for integration testing.
//! In production, `logrelayd` is used as a binary (main.rs).

pub mod cli;
pub mod collector;
pub mod logging;
pub mod metrics_server;
pub mod orchestrator;
pub mod server;
