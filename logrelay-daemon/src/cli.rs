//! CLI argument definitions for logrelayd.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// logrelay daemon.
///
/// Runs either the collecting node (TCP intake, parsing, relay) or the
/// central node (ingest, storage, query) in a single process.
#[derive(Parser, Debug)]
#[command(name = "logrelayd")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to logrelay.toml configuration file.
    ///
    /// When omitted, defaults plus `LOGRELAY_*` environment overrides are used.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Node role to run.
    #[command(subcommand)]
    pub role: Role,
}

/// Node role.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Collecting node: accepts envelopes over TCP and relays records.
    Collector,
    /// Central node: ingests, stores and serves records over HTTP.
    Server,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collector => "collector",
            Self::Server => "server",
        }
    }
}
