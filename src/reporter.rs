use std::future::Future;

use anyhow::Context as _;
use log::{error, info, warn};
use reqwest::header::CONTENT_TYPE;

use crate::config::ReportConfig;
use crate::messages::{Report, TransportResult};
use crate::network::Link;

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Delivers a JSON body to the collector endpoint.
pub trait Transport {
    fn post_json(&self, body: String) -> impl Future<Output = anyhow::Result<HttpResponse>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpTransport {
    pub fn new(config: &ReportConfig) -> anyhow::Result<Self> {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &ReportConfig) -> anyhow::Result<Self> {
        let endpoint = reqwest::Url::parse(&config.endpoint_url)
            .with_context(|| format!("invalid endpoint_url {:?}", config.endpoint_url))?;
        Ok(HttpTransport { client, endpoint })
    }
}

impl Transport for HttpTransport {
    async fn post_json(&self, body: String) -> anyhow::Result<HttpResponse> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

pub struct Reporter<T, L> {
    transport: T,
    link: L,
}

impl<T: Transport, L: Link> Reporter<T, L> {
    pub fn new(transport: T, link: L) -> Self {
        Reporter { transport, link }
    }

    /// Make a single delivery attempt. The outcome is only logged and
    /// returned; nothing is retried or queued.
    pub async fn report(&self, tag: &str, distance_cm: i64) -> TransportResult {
        if !self.link.is_connected().await {
            warn!("Cannot report {tag}, network disconnected");
            return TransportResult::Disconnected;
        }

        let report = Report {
            tag: tag.to_string(),
            distance: distance_cm,
        };
        let body = match serde_json::to_string(&report) {
            Ok(body) => body,
            Err(err) => {
                error!("Could not serialize report for {tag}: {err}");
                return TransportResult::Failed(err.to_string());
            }
        };

        info!("Sending report: {}", body);
        match self.transport.post_json(body).await {
            Ok(response) => {
                info!(
                    "Report for {tag} answered with status {}: {}",
                    response.status, response.body
                );
                TransportResult::Delivered {
                    status: response.status,
                    body: response.body,
                }
            }
            Err(err) => {
                error!("Error sending report for {tag}: {err:#}");
                TransportResult::Failed(format!("{err:#}"))
            }
        }
    }
}
