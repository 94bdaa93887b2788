use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use log::info;

mod beacon;
mod collector;
mod config;
mod estimator;
mod messages;
mod network;
mod radio;
mod reporter;
mod scanner;
#[cfg(test)]
mod testing;

#[derive(Parser, Debug)]
#[command(version, about = "BLE proximity beacon, ranging anchor and report collector")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq)]
enum Role {
    /// Scan for the beacon and report its estimated distance
    Anchor,
    /// Advertise the beacon identity until stopped
    Beacon,
    /// Accept anchor reports and serve the latest distance per tag
    Collector,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let config = config::AppConfig::load(&cli.config)?;

    match cli.role {
        Role::Anchor => run_anchor(&config).await,
        Role::Beacon => beacon::run(&config.beacon.clone().unwrap_or_default()).await,
        Role::Collector => collector::run(&config.collector.clone().unwrap_or_default()).await,
    }
}

async fn run_anchor(config: &config::AppConfig) -> anyhow::Result<()> {
    let report_config = config
        .report
        .as_ref()
        .context("the anchor needs a [report] section with endpoint_url")?;
    let transport = reporter::HttpTransport::new(report_config)?;

    let link = network::NetworkLink::new(config.network.clone());
    network::establish(&link, link.retry_delay()).await;
    if let Some(address) = link.local_address().await {
        info!("Local address: {}", address);
    }

    let radio = radio::BtleRadio::first_adapter().await?;
    let scan = config.scan.clone().unwrap_or_default();
    info!(
        "Looking for {} every {:?} (scan window {:?})",
        scan.target_name(),
        scan.cycle_delay(),
        scan.scan_duration()
    );

    let mut controller =
        scanner::ScanController::new(radio, reporter::Reporter::new(transport, link), &scan);
    controller.run_loop().await
}
