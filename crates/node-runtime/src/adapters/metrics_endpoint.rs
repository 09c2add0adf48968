//! Admin HTTP endpoint.
//!
//! - `GET /metrics`: Prometheus text exposition of the intake metrics
//! - `GET /health`: liveness check

use std::net::SocketAddr;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use quantum_telemetry::encode_metrics;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Content type of the Prometheus text format.
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Bind the metrics listener on all interfaces.
pub async fn bind_metrics_listener(port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await
}

/// Build the admin router.
pub fn metrics_router() -> Router {
    Router::new()
        .route("/metrics", get(scrape_metrics))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
}

async fn scrape_metrics() -> Response {
    match encode_metrics() {
        Ok(body) => ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

/// Serve the admin router until `shutdown` turns true.
pub async fn serve_metrics(listener: TcpListener, mut shutdown: watch::Receiver<bool>) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Metrics endpoint listening");
    }

    let stopped = async move {
        while !*shutdown.borrow_and_update() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }
    };

    match axum::serve(listener, metrics_router())
        .with_graceful_shutdown(stopped)
        .await
    {
        Ok(()) => info!("Metrics endpoint stopped"),
        Err(e) => warn!(error = %e, "Metrics endpoint failed"),
    }
}
