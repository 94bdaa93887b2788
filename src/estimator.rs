use crate::messages::DistanceEstimate;

/// Log-distance path loss model.
///
/// `reference_rssi` is the signal strength observed one meter from the
/// transmitter and `exponent` describes how fast the signal decays in the
/// environment (2.0 in free space, up to ~4.0 indoors).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathLossModel {
    pub reference_rssi: f64,
    pub exponent: f64,
}

impl Default for PathLossModel {
    fn default() -> Self {
        PathLossModel {
            reference_rssi: -65.0,
            exponent: 2.5,
        }
    }
}

impl PathLossModel {
    /// Estimate the distance to a transmitter from its RSSI in dBm.
    ///
    /// No clamping is applied, and centimeters are truncated rather than
    /// rounded; collectors compare against the truncated value.
    pub fn estimate(&self, rssi: i16) -> DistanceEstimate {
        let meters = 10f64.powf((self.reference_rssi - f64::from(rssi)) / (10.0 * self.exponent));
        DistanceEstimate {
            meters,
            centimeters: (meters * 100.0).floor() as i64,
        }
    }
}
