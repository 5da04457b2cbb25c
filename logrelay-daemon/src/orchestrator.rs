//! Role orchestration -- configuration resolution, startup, and shutdown.
//!
//! The [`Orchestrator`] resolves the effective configuration, installs the
//! metrics exporter when enabled, binds the role's listeners and runs until
//! SIGINT or SIGTERM.
//!
//! # Configuration precedence (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. `logrelay.toml` (when `--config` is given)
//! 3. `LOGRELAY_*` environment variables
//! 4. `--log-level` / `--log-format` flags

use std::future::Future;

use anyhow::Result;
use tokio::net::TcpListener;

use logrelay_collector::{CollectorConfig, CollectorPipeline};
use logrelay_core::config::LogRelayConfig;

use crate::cli::{DaemonCli, Role};
use crate::{collector, metrics_server, server};

/// Resolve the effective configuration from CLI arguments.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed, or if the
/// merged configuration fails validation.
pub async fn resolve_config(cli: &DaemonCli) -> Result<LogRelayConfig> {
    let mut config = match &cli.config {
        Some(path) => LogRelayConfig::from_file(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?,
        None => LogRelayConfig::default(),
    };
    config.apply_env_overrides();

    if let Some(level) = &cli.log_level {
        config.general.log_level.clone_from(level);
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format.clone_from(format);
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    Ok(config)
}

/// Runs a single node role.
pub struct Orchestrator {
    config: LogRelayConfig,
    role: Role,
}

impl Orchestrator {
    /// Build from an already-resolved configuration.
    ///
    /// Installs the Prometheus exporter when `[metrics].enabled`.
    pub fn build_from_config(config: LogRelayConfig, role: Role) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        Ok(Self { config, role })
    }

    /// Run the configured role until a shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        let shutdown = shutdown_signal()?;
        self.run_until(shutdown).await
    }

    /// Run the configured role until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(role = self.role.as_str(), "logrelayd starting");

        match self.role {
            Role::Collector => {
                let collector_config = CollectorConfig::from_core(&self.config.collector)
                    .map_err(|e| anyhow::anyhow!("invalid collector config: {}", e))?;
                let pipeline = CollectorPipeline::from_config(collector_config)
                    .map_err(|e| anyhow::anyhow!("failed to build collector pipeline: {}", e))?;
                let http_listener = bind(&self.config.collector.http_addr).await?;
                collector::run(pipeline, http_listener, shutdown).await?;
            }
            Role::Server => {
                let store = server::open_store(&self.config.server).await?;
                let listener = bind(&self.config.server.listen_addr).await?;
                server::serve(listener, store, shutdown).await?;
            }
        }

        tracing::info!(role = self.role.as_str(), "logrelayd shut down");
        Ok(())
    }

    /// The resolved configuration.
    pub fn config(&self) -> &LogRelayConfig {
        &self.config
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", addr, e))
}

/// Install SIGTERM and SIGINT handlers and return a future that resolves
/// on whichever arrives first.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
pub fn shutdown_signal() -> Result<impl Future<Output = ()> + Send + 'static> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        tracing::info!(signal = name, "shutdown signal received");
    })
}
