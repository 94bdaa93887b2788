use anyhow::Context as _;
use btleplug::api::{Central as _, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use futures::StreamExt as _;
use futures::stream::BoxStream;
use log::{debug, info};

use crate::messages::Advertisement;
use crate::scanner::Radio;

/// BLE central backed by the host's first Bluetooth adapter.
pub struct BtleRadio {
    adapter: Adapter,
}

impl BtleRadio {
    pub async fn first_adapter() -> anyhow::Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .context("no Bluetooth adapter found")?;
        info!("Scanning with adapter {}", adapter.adapter_info().await?);
        Ok(BtleRadio { adapter })
    }
}

impl Radio for BtleRadio {
    async fn start_scan(&mut self) -> anyhow::Result<BoxStream<'static, Advertisement>> {
        let events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        let adapter = self.adapter.clone();
        Ok(events
            .filter_map(move |event| {
                let adapter = adapter.clone();
                async move { advertisement_from_event(&adapter, event).await }
            })
            .boxed())
    }

    async fn stop_scan(&mut self) -> anyhow::Result<()> {
        self.adapter.stop_scan().await?;
        Ok(())
    }
}

async fn advertisement_from_event(adapter: &Adapter, event: CentralEvent) -> Option<Advertisement> {
    let id = match event {
        CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
        _ => return None,
    };
    let peripheral = match adapter.peripheral(&id).await {
        Ok(peripheral) => peripheral,
        Err(err) => {
            debug!("Peripheral {:?} vanished: {}", id, err);
            return None;
        }
    };
    let properties = match peripheral.properties().await {
        Ok(properties) => properties?,
        Err(err) => {
            debug!("No properties for {:?}: {}", id, err);
            return None;
        }
    };
    // Cached devices without a fresh RSSI cannot be ranged.
    let rssi = properties.rssi?;
    Some(Advertisement {
        name: properties.local_name,
        rssi,
    })
}
