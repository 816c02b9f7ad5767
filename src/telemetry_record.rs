use crate::error::DecodeError;
use serde_derive::Deserialize;

/// Number of readings a record needs before any measurement is derived from it.
pub const MIN_READINGS: usize = 51;

/// One status frame as reported by the inverter.
///
/// Wire shape: `{"type": "...", "SN": "...", "ver": "...", "Data": [..]}`.
/// Unknown keys (the device also sends `Information`) are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelemetryRecord {
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(rename = "SN", default)]
    pub serial: String,
    #[serde(rename = "ver", default)]
    pub version: String,
    #[serde(rename = "Data")]
    pub readings: Vec<f64>,
}

impl TelemetryRecord {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(frame)?)
    }

    /// Whether the record carries enough readings to update measurements
    pub fn is_complete(&self) -> bool {
        self.readings.len() >= MIN_READINGS
    }
}
