use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context as _, bail};
use serde_derive::Deserialize;
use uuid::Uuid;

use crate::estimator::PathLossModel;

pub const DEFAULT_DEVICE_NAME: &str = "REPETIDOR_BLE";
/// Battery Service, a UUID most scanners already know how to display.
pub const DEFAULT_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub network: Option<NetworkConfig>,
    pub report: Option<ReportConfig>,
    pub scan: Option<ScanConfig>,
    pub beacon: Option<BeaconConfig>,
    pub collector: Option<CollectorConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NetworkConfig {
    pub name: String,
    pub passphrase: Option<String>,
    pub interface: Option<String>,
    pub join_retry_millis: Option<u64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ReportConfig {
    pub endpoint_url: String,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct ScanConfig {
    pub target_name: Option<String>,
    /// RSSI measured at one meter from the beacon, in dBm.
    pub reference_rssi: Option<f64>,
    pub path_loss_exponent: Option<f64>,
    pub scan_duration_seconds: Option<u64>,
    pub cycle_delay_seconds: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct BeaconConfig {
    pub device_name: Option<String>,
    pub service_uuid: Option<Uuid>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct CollectorConfig {
    pub listen: Option<SocketAddr>,
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: AppConfig = toml::de::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let scan = self.scan.clone().unwrap_or_default();
        let model = scan.model();
        if !model.reference_rssi.is_finite() {
            bail!("scan.reference_rssi must be a finite number");
        }
        if !(model.exponent.is_finite() && model.exponent > 0.0) {
            bail!("scan.path_loss_exponent must be a positive number");
        }
        if scan.scan_duration().is_zero() {
            bail!("scan.scan_duration_seconds must be at least 1");
        }
        if scan.cycle_delay().is_zero() {
            bail!("scan.cycle_delay_seconds must be at least 1");
        }
        Ok(())
    }
}

impl NetworkConfig {
    pub fn join_retry(&self) -> Duration {
        Duration::from_millis(self.join_retry_millis.unwrap_or(500))
    }
}

impl ScanConfig {
    pub fn target_name(&self) -> &str {
        self.target_name.as_deref().unwrap_or(DEFAULT_DEVICE_NAME)
    }

    pub fn model(&self) -> PathLossModel {
        let default = PathLossModel::default();
        PathLossModel {
            reference_rssi: self.reference_rssi.unwrap_or(default.reference_rssi),
            exponent: self.path_loss_exponent.unwrap_or(default.exponent),
        }
    }

    pub fn scan_duration(&self) -> Duration {
        Duration::from_secs(self.scan_duration_seconds.unwrap_or(5))
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_secs(self.cycle_delay_seconds.unwrap_or(5))
    }
}

impl CollectorConfig {
    pub fn listen(&self) -> SocketAddr {
        self.listen
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)))
    }
}

impl BeaconConfig {
    pub fn device_name(&self) -> &str {
        self.device_name.as_deref().unwrap_or(DEFAULT_DEVICE_NAME)
    }

    pub fn service_uuid(&self) -> Uuid {
        self.service_uuid.unwrap_or(DEFAULT_SERVICE_UUID)
    }
}
