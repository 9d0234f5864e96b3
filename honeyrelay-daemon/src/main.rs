use anyhow::Result;
use clap::Parser;

use honeyrelay_daemon::Dispatcher;
use honeyrelay_daemon::cli::DaemonCli;
use honeyrelay_daemon::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();
    let config = cli.load_config().await?;

    if cli.validate {
        println!("configuration is valid");
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "honeyrelay starting");

    let mut dispatcher = Dispatcher::build(config, cli.dry_run)?;
    dispatcher.run().await?;

    tracing::info!("honeyrelay shut down");
    Ok(())
}
