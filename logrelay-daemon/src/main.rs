use anyhow::Result;
use clap::Parser;

use logrelay_daemon::cli::DaemonCli;
use logrelay_daemon::logging;
use logrelay_daemon::orchestrator::{self, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();
    let config = orchestrator::resolve_config(&cli).await?;

    if cli.validate {
        println!("configuration is valid ({} role)", cli.role.as_str());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;

    Orchestrator::build_from_config(config, cli.role)?.run().await
}
