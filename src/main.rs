use anyhow::Context;
use clap::Parser;
use page_capture::{load_config, setup_logging, Cli, CliRunner};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    setup_logging(args.verbose).map_err(|e| anyhow::anyhow!(e))?;

    info!("Starting page-capture v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)
        .await
        .context("Failed to load configuration")?;

    let cli_runner = CliRunner::new(config);
    cli_runner
        .run(args.command.unwrap_or_default())
        .await
        .context("page-capture failed")?;

    info!("page-capture stopped");
    Ok(())
}
