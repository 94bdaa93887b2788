//! HTTP collector the anchors report to.
//!
//! Keeps the latest distance per tag in memory and serves it back as JSON.
//! Nothing survives a restart.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context as _;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{info, warn};
use serde_derive::Serialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use crate::config::CollectorConfig;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TagStatus {
    /// Centimeters.
    pub distance: i64,
    pub last_update: String,
}

#[derive(Clone, Debug, Default)]
pub struct Collector {
    tags: Arc<RwLock<BTreeMap<String, TagStatus>>>,
}

impl Collector {
    pub async fn record(&self, tag: String, distance: i64) {
        let status = TagStatus {
            distance,
            last_update: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        self.tags.write().await.insert(tag, status);
    }

    pub async fn snapshot(&self) -> BTreeMap<String, TagStatus> {
        self.tags.read().await.clone()
    }
}

pub fn router(collector: Collector) -> Router {
    Router::new()
        .route("/api/data", post(receive_report))
        .route("/api/status", get(status))
        .with_state(collector)
}

pub async fn run(config: &CollectorConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.listen())
        .await
        .with_context(|| format!("binding collector to {}", config.listen()))?;
    info!("Collector listening on {}", listener.local_addr()?);
    axum::serve(listener, router(Collector::default())).await?;
    Ok(())
}

async fn receive_report(
    State(collector): State<Collector>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let (tag, distance) = match parse_report(&body) {
        Ok(report) => report,
        Err(reason) => {
            warn!("Rejected report: {}", reason);
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": reason })));
        }
    };
    info!("Received report: {} at {} cm", tag, distance);
    collector.record(tag, distance).await;
    (StatusCode::OK, Json(json!({ "message": "Data received" })))
}

async fn status(State(collector): State<Collector>) -> Json<BTreeMap<String, TagStatus>> {
    Json(collector.snapshot().await)
}

/// Accepts any JSON object carrying `tag` and `distance`. Non-string tags
/// are stringified; the distance may be a number (truncated) or a numeric
/// string.
fn parse_report(body: &[u8]) -> Result<(String, i64), &'static str> {
    let value: Value = serde_json::from_slice(body).map_err(|_| "body is not valid JSON")?;
    let fields = value.as_object();
    let (Some(tag), Some(distance)) = (
        fields.and_then(|f| f.get("tag")),
        fields.and_then(|f| f.get("distance")),
    ) else {
        return Err("missing 'tag' or 'distance'");
    };

    let tag = match tag {
        Value::String(tag) => tag.clone(),
        other => other.to_string(),
    };
    let distance = match distance {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or("'distance' must be an integer")?;

    Ok((tag, distance))
}
