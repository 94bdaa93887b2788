use std::future::Future;
use std::time::Duration;

use anyhow::{Context as _, bail};
use log::{debug, info, warn};
use tokio::process::Command;

use crate::config::NetworkConfig;

const DEFAULT_JOIN_RETRY: Duration = Duration::from_millis(500);

/// Connectivity to the network the collector is reachable through.
pub trait Link {
    fn join(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn is_connected(&self) -> impl Future<Output = bool> + Send;
}

/// WiFi link driven through NetworkManager.
///
/// Without a `[network]` section the host is expected to manage its own
/// connection and the link always reports itself connected.
#[derive(Debug, Clone)]
pub struct NetworkLink {
    config: Option<NetworkConfig>,
}

impl NetworkLink {
    pub fn new(config: Option<NetworkConfig>) -> Self {
        NetworkLink { config }
    }

    pub fn retry_delay(&self) -> Duration {
        self.config
            .as_ref()
            .map(NetworkConfig::join_retry)
            .unwrap_or(DEFAULT_JOIN_RETRY)
    }

    pub async fn local_address(&self) -> Option<String> {
        let interface = self.config.as_ref()?.interface.as_deref()?;
        match nmcli(&["-g", "IP4.ADDRESS", "device", "show", interface]).await {
            Ok(output) => output
                .lines()
                .next()
                .map(str::trim)
                .filter(|address| !address.is_empty())
                .map(str::to_string),
            Err(err) => {
                debug!("Could not read address of {interface}: {err:#}");
                None
            }
        }
    }
}

impl Link for NetworkLink {
    async fn join(&self) -> anyhow::Result<()> {
        let Some(network) = &self.config else {
            return Ok(());
        };
        info!("Joining network {}", network.name);

        let mut args = vec!["device", "wifi", "connect", network.name.as_str()];
        if let Some(passphrase) = &network.passphrase {
            args.extend(["password", passphrase.as_str()]);
        }
        if let Some(interface) = &network.interface {
            args.extend(["ifname", interface.as_str()]);
        }
        nmcli(&args).await?;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        if self.config.is_none() {
            return true;
        }
        match nmcli(&["-t", "-f", "STATE", "general"]).await {
            Ok(state) => is_connected_state(&state),
            Err(err) => {
                debug!("Connectivity check failed: {err:#}");
                false
            }
        }
    }
}

async fn nmcli(args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("nmcli")
        .args(args)
        .output()
        .await
        .context("running nmcli")?;
    if !output.status.success() {
        // args may carry the passphrase
        bail!(
            "nmcli exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// NetworkManager reports `connected`, `connected (site only)` or
/// `connected (local only)` once a link is up.
fn is_connected_state(state: &str) -> bool {
    state.trim().starts_with("connected")
}

/// Block until the link is up, retrying with a fixed delay.
///
/// A failed join is attempted again on the next round; once a join has
/// been accepted only connectivity is polled.
pub async fn establish<L: Link>(link: &L, retry_delay: Duration) {
    let mut joined = false;
    let mut attempts: u64 = 0;
    loop {
        if !joined {
            match link.join().await {
                Ok(()) => joined = true,
                Err(err) => warn!("Network join failed: {err:#}"),
            }
        }
        if link.is_connected().await {
            info!("Network connected after {} retries", attempts);
            return;
        }
        attempts += 1;
        debug!("Network not connected yet, retrying in {:?}", retry_delay);
        tokio::time::sleep(retry_delay).await;
    }
}
