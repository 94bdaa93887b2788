//! Scripted stand-ins for the radio, the network link and the HTTP transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use futures::StreamExt as _;
use futures::stream::{self, BoxStream};
use log::{LevelFilter, Log, Metadata, Record};
use tokio::time::Instant;

use crate::messages::Advertisement;
use crate::network::Link;
use crate::reporter::{HttpResponse, Transport};
use crate::scanner::Radio;

pub fn advertisement(name: Option<&str>, rssi: i16) -> Advertisement {
    Advertisement {
        name: name.map(str::to_string),
        rssi,
    }
}

static CAPTURED: Mutex<Vec<String>> = Mutex::new(Vec::new());

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED
            .lock()
            .unwrap()
            .push(format!("{} {}", record.level(), record.args()));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Route `log` records into memory. Safe to call from several tests.
pub fn capture_logs() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Trace);
    }
}

pub fn logs_containing(needle: &str) -> Vec<String> {
    CAPTURED
        .lock()
        .unwrap()
        .iter()
        .filter(|line| line.contains(needle))
        .cloned()
        .collect()
}

/// HTTP client that ignores proxy settings of the machine running the tests.
pub fn direct_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Connects once `connect_after` connectivity checks have failed.
#[derive(Default)]
pub struct FakeLink {
    pub connect_after: usize,
    pub failing_joins: usize,
    pub checks: AtomicUsize,
    pub joins: AtomicUsize,
}

impl FakeLink {
    pub fn disconnected() -> Self {
        FakeLink {
            connect_after: usize::MAX,
            ..FakeLink::default()
        }
    }
}

impl Link for FakeLink {
    async fn join(&self) -> anyhow::Result<()> {
        if self.joins.fetch_add(1, Ordering::SeqCst) < self.failing_joins {
            bail!("association rejected");
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst) >= self.connect_after
    }
}

/// Records every body it is asked to post.
pub struct FakeTransport {
    response: Result<HttpResponse, String>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl FakeTransport {
    pub fn responding(status: u16, body: &str) -> Self {
        FakeTransport {
            response: Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
            sent: Arc::default(),
        }
    }

    pub fn failing(reason: &str) -> Self {
        FakeTransport {
            response: Err(reason.to_string()),
            sent: Arc::default(),
        }
    }

    pub fn sent(&self) -> Arc<Mutex<Vec<String>>> {
        self.sent.clone()
    }
}

impl Transport for FakeTransport {
    async fn post_json(&self, body: String) -> anyhow::Result<HttpResponse> {
        self.sent.lock().unwrap().push(body);
        match &self.response {
            Ok(response) => Ok(response.clone()),
            Err(reason) => bail!("{reason}"),
        }
    }
}

/// Replays one batch of advertisements per scan.
///
/// With `stay_open` the stream stays pending after its batch, like a radio
/// that keeps listening until it is stopped. The first `failing_starts`
/// scans fail to start.
#[derive(Default)]
pub struct FakeRadio {
    pub batches: VecDeque<Vec<Advertisement>>,
    pub stay_open: bool,
    pub failing_starts: usize,
    pub starts: usize,
    pub started_at: Vec<Instant>,
    pub stops: usize,
}

impl FakeRadio {
    pub fn listening(batches: Vec<Vec<Advertisement>>) -> Self {
        FakeRadio {
            batches: batches.into(),
            stay_open: true,
            ..FakeRadio::default()
        }
    }
}

impl Radio for FakeRadio {
    async fn start_scan(&mut self) -> anyhow::Result<BoxStream<'static, Advertisement>> {
        self.starts += 1;
        self.started_at.push(Instant::now());
        if self.starts <= self.failing_starts {
            bail!("adapter powered off");
        }
        let batch = stream::iter(self.batches.pop_front().unwrap_or_default());
        if self.stay_open {
            Ok(batch.chain(stream::pending()).boxed())
        } else {
            Ok(batch.boxed())
        }
    }

    async fn stop_scan(&mut self) -> anyhow::Result<()> {
        self.stops += 1;
        Ok(())
    }
}
