//! Inverter Telemetry Bridge Library
//!
//! This library accepts the raw status stream of a single solar inverter over TCP,
//! recovers the JSON frames embedded in it and republishes the derived measurements
//! as a Prometheus scrape endpoint.

pub mod config;
pub mod error;
pub mod frame_extractor;
pub mod measurement_set;
pub mod scrape_server;
pub mod telemetry_bridge;
pub mod telemetry_record;

// Re-export commonly used types for easier access
pub use config::BridgeConfig;
pub use error::{BridgeError, DecodeError};
pub use frame_extractor::FrameExtractor;
pub use measurement_set::{MeasurementSet, MeasurementSnapshot};
pub use scrape_server::ScrapeServer;
pub use telemetry_bridge::{FrameOutcome, TelemetryBridge};
pub use telemetry_record::TelemetryRecord;
