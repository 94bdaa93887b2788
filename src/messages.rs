use serde_derive::Serialize;

/// A single advertisement seen during a scan.
#[derive(Clone, Debug, PartialEq)]
pub struct Advertisement {
    pub name: Option<String>,
    pub rssi: i16,
}

impl Advertisement {
    /// Exact, case-sensitive name match. Unnamed devices never match.
    pub fn is_named(&self, target: &str) -> bool {
        self.name.as_deref() == Some(target)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceEstimate {
    pub meters: f64,
    pub centimeters: i64,
}

/// Body posted to the collector.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub tag: String,
    /// Centimeters.
    pub distance: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TransportResult {
    Delivered { status: u16, body: String },
    Failed(String),
    Disconnected,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    Found {
        rssi: i16,
        estimate: DistanceEstimate,
        result: TransportResult,
    },
    NotFound,
    ScanFailed(String),
}
