use crate::error::BridgeError;
use crate::frame_extractor::FrameExtractor;
use crate::measurement_set::MeasurementSet;
use crate::scrape_server::{ScrapeServer, SharedRegistry};
use crate::telemetry_record::TelemetryRecord;
use prometheus::Registry;
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tokio::net::TcpListener;
use tracing::{debug, error, warn};

/// What happened to a single frame pulled off the device stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Applied,
    /// Decoded, but too few readings to update anything
    Incomplete,
    /// Not valid JSON or not the expected shape; dropped
    Malformed,
}

/// Ingestion loop for one device connection.
///
/// Frames are extracted, decoded and applied strictly in order on the calling
/// task. The scrape server is started on the first frame that decodes.
pub struct TelemetryBridge<R> {
    frames: FrameExtractor<R>,
    measurements: MeasurementSet,
    registry: SharedRegistry,
    pending_scrape_listener: Option<TcpListener>,
    scrape_server: Option<ScrapeServer>,
}

impl<R> TelemetryBridge<R>
where
    R: AsyncBufRead + Unpin,
{
    /// `scrape_listener` of `None` runs ingestion without ever serving `/metrics`
    pub fn new(
        reader: R,
        measurements: MeasurementSet,
        scrape_listener: Option<TcpListener>,
    ) -> Result<Self, BridgeError> {
        let registry = Arc::new(Registry::new());
        measurements.register(&registry)?;
        Ok(Self {
            frames: FrameExtractor::new(reader),
            measurements,
            registry,
            pending_scrape_listener: scrape_listener,
            scrape_server: None,
        })
    }

    /// Processes frames until the device stream fails.
    ///
    /// Only ever returns with [`BridgeError::StreamFatal`] (or a scrape server
    /// start failure); the connection is not retried.
    pub async fn run(&mut self) -> Result<(), BridgeError> {
        loop {
            if let Err(err) = self.process_next_frame().await {
                error!(error = %err, "telemetry ingestion stopped");
                return Err(err);
            }
        }
    }

    /// Waits for one frame and applies it
    pub async fn process_next_frame(&mut self) -> Result<FrameOutcome, BridgeError> {
        let frame = self.frames.next_frame().await?;
        let record = match TelemetryRecord::decode(&frame) {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, frame = %String::from_utf8_lossy(&frame), "invalid packet");
                return Ok(FrameOutcome::Malformed);
            }
        };

        let outcome = if record.is_complete() {
            FrameOutcome::Applied
        } else {
            FrameOutcome::Incomplete
        };
        self.measurements.apply(&record);
        debug!(
            total_energy = self.measurements.total_energy(),
            serial = %record.serial,
            "record processed"
        );

        self.start_scrape_server()?;
        Ok(outcome)
    }

    fn start_scrape_server(&mut self) -> Result<(), BridgeError> {
        if let Some(listener) = self.pending_scrape_listener.take() {
            self.scrape_server = Some(ScrapeServer::spawn(listener, self.registry.clone())?);
        }
        Ok(())
    }

    pub fn measurements(&self) -> &MeasurementSet {
        &self.measurements
    }

    pub fn scrape_server(&self) -> Option<&ScrapeServer> {
        self.scrape_server.as_ref()
    }
}
