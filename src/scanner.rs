use std::future::Future;
use std::time::Duration;

use futures::StreamExt as _;
use futures::stream::BoxStream;
use log::{debug, error, info, trace, warn};

use crate::config::ScanConfig;
use crate::estimator::PathLossModel;
use crate::messages::{Advertisement, CycleOutcome};
use crate::network::Link;
use crate::reporter::{Reporter, Transport};

/// Source of advertisements for one scan at a time.
pub trait Radio {
    fn start_scan(
        &mut self,
    ) -> impl Future<Output = anyhow::Result<BoxStream<'static, Advertisement>>> + Send;
    fn stop_scan(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

pub struct ScanController<R, T, L> {
    radio: R,
    reporter: Reporter<T, L>,
    target_name: String,
    model: PathLossModel,
    scan_duration: Duration,
    cycle_delay: Duration,
}

impl<R: Radio, T: Transport, L: Link> ScanController<R, T, L> {
    pub fn new(radio: R, reporter: Reporter<T, L>, config: &ScanConfig) -> Self {
        ScanController {
            radio,
            reporter,
            target_name: config.target_name().to_string(),
            model: config.model(),
            scan_duration: config.scan_duration(),
            cycle_delay: config.cycle_delay(),
        }
    }

    pub async fn run_loop(&mut self) -> anyhow::Result<()> {
        loop {
            info!("Starting scan for {}", self.target_name);
            match self.run_cycle().await {
                CycleOutcome::ScanFailed(reason) => error!("Scan failed: {}", reason),
                CycleOutcome::Found { .. } | CycleOutcome::NotFound => {}
            }
            info!("Scan cycle finished, next one in {:?}", self.cycle_delay);
            tokio::time::sleep(self.cycle_delay).await;
        }
    }

    /// Scan until the target is seen or the scan duration runs out.
    ///
    /// The first matching advertisement is reported and ends the scan, so a
    /// cycle produces at most one report. The report itself is not bounded
    /// by the scan duration.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let mut advertisements = match self.radio.start_scan().await {
            Ok(advertisements) => advertisements,
            Err(err) => return CycleOutcome::ScanFailed(format!("{err:#}")),
        };

        // The match lives only for this cycle; the next cycle starts unmatched.
        let target = self.target_name.as_str();
        let matched = tokio::time::timeout(self.scan_duration, async {
            while let Some(advertisement) = advertisements.next().await {
                if advertisement.is_named(target) {
                    return Some(advertisement);
                }
                trace!("Ignoring advertisement from {:?}", advertisement.name);
            }
            debug!("Advertisement stream ended before the scan duration");
            None
        })
        .await
        .ok()
        .flatten();

        let outcome = match matched {
            Some(advertisement) => self.on_match(advertisement).await,
            None => {
                info!("{} not found in this cycle", self.target_name);
                CycleOutcome::NotFound
            }
        };

        if let Err(err) = self.radio.stop_scan().await {
            warn!("Error stopping scan: {:#}", err);
        }
        outcome
    }

    async fn on_match(&self, advertisement: Advertisement) -> CycleOutcome {
        let rssi = advertisement.rssi;
        let estimate = self.model.estimate(rssi);
        info!(
            "Found {} (RSSI {} dBm), estimated distance {:.2} m",
            self.target_name, rssi, estimate.meters
        );

        let result = self
            .reporter
            .report(&self.target_name, estimate.centimeters)
            .await;

        CycleOutcome::Found {
            rssi,
            estimate,
            result,
        }
    }
}
