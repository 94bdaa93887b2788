//! Advertises the beacon identity the anchor scans for.
//!
//! btleplug only speaks the central role, so the peripheral side goes
//! through BlueZ directly. BlueZ moves the local name into the scan
//! response when it does not fit the primary advertisement, which keeps
//! the beacon visible to both active and passive scanners.

use crate::config::BeaconConfig;

#[cfg(target_os = "linux")]
const HEARTBEAT: std::time::Duration = std::time::Duration::from_secs(2);

#[cfg(target_os = "linux")]
pub async fn run(config: &BeaconConfig) -> anyhow::Result<()> {
    use log::{debug, info};

    let session = bluer::Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;
    adapter.set_alias(config.device_name().to_string()).await?;

    let _handle = adapter.advertise(advertisement(config)).await?;
    info!(
        "Advertising as '{}' with service {} on {}",
        config.device_name(),
        config.service_uuid(),
        adapter.name()
    );

    // Dropping the handle unregisters the advertisement.
    loop {
        tokio::time::sleep(HEARTBEAT).await;
        debug!("Still advertising as '{}'", config.device_name());
    }
}

#[cfg(not(target_os = "linux"))]
pub async fn run(_config: &BeaconConfig) -> anyhow::Result<()> {
    anyhow::bail!("advertising requires BlueZ and is only supported on Linux")
}

#[cfg(target_os = "linux")]
fn advertisement(config: &BeaconConfig) -> bluer::adv::Advertisement {
    bluer::adv::Advertisement {
        advertisement_type: bluer::adv::Type::Peripheral,
        service_uuids: [config.service_uuid()].into_iter().collect(),
        local_name: Some(config.device_name().to_string()),
        discoverable: Some(true),
        ..Default::default()
    }
}
