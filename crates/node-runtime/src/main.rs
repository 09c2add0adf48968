//! # Hashgraph Intake Node
//!
//! Runs the event intake pipeline of a hashgraph node.
//!
//! ## Pipeline
//!
//! ```text
//! gossip ──submit_event──→ hasher → collector → internal validator
//!                                 → deduplicator → signature validator
//!                                 → orphan buffer ──→ consensus + gossip
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize telemetry (logs, traces, metrics)
//! 3. Build and start the intake pipeline
//! 4. Start the metrics endpoint and status reporter
//! 5. Wait for Ctrl+C, then flush and stop

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use node_runtime::adapters::{bind_metrics_listener, serve_metrics};
use node_runtime::{IntakeContainer, NodeConfig};
use qc_event_intake::EventIntakeApi;

/// Interval between status log lines.
const STATUS_INTERVAL: Duration = Duration::from_secs(30);

/// The node runtime owning the intake pipeline.
pub struct NodeRuntime {
    config: NodeConfig,
    container: IntakeContainer,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    /// Create a new node runtime with configuration.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let container =
            IntakeContainer::new(&config).context("Failed to build intake pipeline")?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            config,
            container,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Start the pipeline and background tasks.
    pub async fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  Hashgraph Intake Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        debug!(
            diagram = %self.container.service.wiring_diagram(),
            "Intake pipeline wiring"
        );
        self.container
            .service
            .start()
            .context("Failed to start intake pipeline")?;

        if self.config.telemetry.metrics_port != 0 {
            let listener = bind_metrics_listener(self.config.telemetry.metrics_port)
                .await
                .with_context(|| {
                    format!(
                        "Failed to bind metrics port {}",
                        self.config.telemetry.metrics_port
                    )
                })?;
            tokio::spawn(serve_metrics(listener, self.shutdown_rx.clone()));
        }

        self.spawn_status_reporter();

        info!(
            software_version = %self.config.intake.software_version,
            ancient_mode = ?self.config.intake.ancient_mode,
            nodes = self.config.address_book.len(),
            "Intake pipeline running"
        );
        Ok(())
    }

    fn spawn_status_reporter(&self) {
        let service = Arc::clone(&self.container.service);
        let misbehavior = Arc::clone(&self.container.misbehavior);
        let mut shutdown = self.shutdown_rx.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(STATUS_INTERVAL);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        info!(
                            unprocessed = service.unprocessed_count(),
                            misbehavior_reports = misbehavior.total_reports(),
                            "Intake status"
                        );
                    }
                    _ = shutdown.changed() => break,
                }
            }
        });
    }

    /// Shutdown the node gracefully.
    ///
    /// ## Shutdown Sequence
    ///
    /// 1. Flush the pipeline so in-flight events reach consensus
    /// 2. Stop the pipeline
    /// 3. Signal background tasks to stop
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        let service = Arc::clone(&self.container.service);
        match tokio::task::spawn_blocking(move || service.flush_all()).await {
            Ok(Ok(())) => info!("Intake pipeline flushed"),
            Ok(Err(e)) => warn!(error = %e, "Failed to flush intake pipeline"),
            Err(e) => error!(error = %e, "Flush task failed"),
        }
        self.container.service.stop();

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        info!("Shutdown complete");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env().context("Invalid node configuration")?;

    let _telemetry = quantum_telemetry::init_telemetry(config.telemetry.clone())
        .await
        .context("Failed to initialize telemetry")?;

    let runtime = NodeRuntime::new(config)?;
    runtime.start().await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
