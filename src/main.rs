//! Main entry point for the xray-export CLI application.
//!
//! Reads the target and credentials from flags or environment, exports the
//! selected Cucumber features and extracts them into the output directory.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use xray_export::{Cli, ExportClient, ReqwestTransport};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.to_config()?;

    let transport = ReqwestTransport::new(cli.timeout()).context("failed to build HTTP client")?;
    let client = ExportClient::new(transport);

    let summary = client
        .submit(&config, &cli.output)
        .await
        .with_context(|| format!("{} export failed", config.variant()))?;

    tracing::info!(
        "Extracted {} files and {} directories ({} bytes) into {}",
        summary.files,
        summary.directories,
        summary.bytes_written,
        cli.output.display()
    );

    Ok(())
}
