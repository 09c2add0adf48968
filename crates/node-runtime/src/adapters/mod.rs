//! Concrete collaborators for the intake pipeline.

mod gateways;
mod metrics;
mod metrics_endpoint;

pub use gateways::{LoggingConsensusGateway, LoggingGossipGateway};
pub use metrics::PrometheusIntakeMetrics;
pub use metrics_endpoint::{bind_metrics_listener, metrics_router, serve_metrics};
