use crate::error::BridgeError;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub type SharedRegistry = Arc<Registry>;

/// Router exposing `registry` in the Prometheus text format at `/metrics`
pub fn metrics_router(registry: SharedRegistry) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(registry)
}

async fn metrics_handler(State(registry): State<SharedRegistry>) -> Response {
    let encoder = TextEncoder::new();
    let mut body = Vec::new();
    match encoder.encode(&registry.gather(), &mut body) {
        Ok(()) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(prometheus::TEXT_FORMAT),
            )],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding error").into_response()
        }
    }
}

/// Handle to the spawned scrape endpoint
#[derive(Debug)]
pub struct ScrapeServer {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ScrapeServer {
    /// Starts serving `/metrics` on an already bound listener
    pub fn spawn(listener: TcpListener, registry: SharedRegistry) -> Result<Self, BridgeError> {
        let addr = listener.local_addr().map_err(BridgeError::ScrapeServer)?;
        info!(address = %addr, "starting scrape server");
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, metrics_router(registry)).await {
                error!(error = %err, "scrape server stopped");
            }
        });
        Ok(Self { addr, task })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement_set::MeasurementSet;
    use crate::telemetry_record::TelemetryRecord;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn scrape(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn record_with_frequency(frequency: f64) -> TelemetryRecord {
        let mut readings = vec![0.0; 51];
        readings[0] = 0.6;
        readings[5] = 236.3;
        readings[6] = 238.0;
        readings[50] = frequency;
        TelemetryRecord {
            device_type: "X".to_string(),
            serial: "S1".to_string(),
            version: "1.0".to_string(),
            readings,
        }
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let (status, body) = scrape(metrics_router(Arc::new(Registry::new())), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_exposition_follows_publication_state() {
        let registry = Arc::new(Registry::new());
        let measurements = MeasurementSet::new().unwrap();
        measurements.register(&registry).unwrap();
        let router = metrics_router(registry);

        measurements.apply(&record_with_frequency(49.98));
        let (status, body) = scrape(router.clone(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("input_current_ampere{array=\"1\"} 0.6"));
        assert!(body.contains("output_power_watt 238"));
        assert!(body.contains("output_voltage 236.3"));
        assert!(body.contains("grid_frequency_hertz 49.98"));
        assert!(body.contains("# TYPE total_energy_kwh gauge"));

        measurements.apply(&record_with_frequency(0.0));
        let (_, body) = scrape(router, "/metrics").await;
        assert!(body.contains("output_power_watt 238"));
        assert!(!body.contains("output_voltage"));
        assert!(!body.contains("total_energy_kwh"));
        assert!(!body.contains("grid_frequency_hertz"));
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let (status, _) = scrape(metrics_router(Arc::new(Registry::new())), "/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_spawned_server_reports_bound_address() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let expected = listener.local_addr().unwrap();
        let server = ScrapeServer::spawn(listener, Arc::new(Registry::new())).unwrap();
        assert_eq!(server.local_addr(), expected);
        assert!(server.is_running());
    }
}
