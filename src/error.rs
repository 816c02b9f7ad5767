use std::io;

/// Failure to turn a candidate frame into a [`TelemetryRecord`](crate::TelemetryRecord).
///
/// Always recoverable: the frame is dropped and ingestion moves on.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),
}

/// Errors that end the bridge or prevent it from starting.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The device stream failed or closed. Ingestion cannot continue on this connection.
    #[error("telemetry stream failed: {0}")]
    StreamFatal(#[from] io::Error),

    #[error("invalid value {value:?} for {key}")]
    Config { key: &'static str, value: String },

    #[error("failed to register measurements: {0}")]
    Registry(#[from] prometheus::Error),

    #[error("scrape server error: {0}")]
    ScrapeServer(#[source] io::Error),
}

impl BridgeError {
    pub fn is_stream_fatal(&self) -> bool {
        matches!(self, BridgeError::StreamFatal(_))
    }
}
