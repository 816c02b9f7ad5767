use anyhow::Context;
use inverter_telemetry_bridge::{BridgeConfig, MeasurementSet, TelemetryBridge};
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting inverter telemetry bridge");
    let config = BridgeConfig::from_env().context("invalid bridge configuration")?;

    // Bind the scrape port up front so a conflict fails at startup, not on the first frame
    let scrape_listener = TcpListener::bind(config.scrape_addr())
        .await
        .with_context(|| format!("failed to bind scrape listener {}", config.scrape_addr()))?;
    let inbound_listener = TcpListener::bind(config.inbound_addr())
        .await
        .with_context(|| format!("failed to bind inbound listener {}", config.inbound_addr()))?;
    info!(address = %config.inbound_addr(), "waiting for inverter connection");

    // A single device connection is served; when it ends the process exits
    let (stream, peer) = inbound_listener
        .accept()
        .await
        .context("failed to accept inverter connection")?;
    info!(peer = %peer, "inverter connected");

    let measurements = MeasurementSet::new().context("failed to create measurements")?;
    let mut bridge = TelemetryBridge::new(BufReader::new(stream), measurements, Some(scrape_listener))?;
    bridge
        .run()
        .await
        .context("telemetry ingestion stopped")
}
