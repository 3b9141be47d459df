//! Fluent assembly of a [`Server`].
//!
//! ```ignore
//! let (graceful_tx, graceful_rx) = watch::channel(());
//! let server = ServerBuilder::new(config, graceful_rx.clone())
//!     .gateway(custom_gateway) // optional, defaults to MemoryGateway
//!     .start_metrics_server(graceful_rx.clone())
//!     .build();
//! server.run().await?;
//! ```

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;
use tracing::info;

use super::Server;
use crate::api::ApiState;
use crate::gateway::MemoryGateway;
use crate::gateway::ResourceGateway;
use crate::metrics;
use crate::GatewayConfig;

pub struct ServerBuilder {
    pub(super) config: GatewayConfig,
    pub(super) gateway: Option<Arc<dyn ResourceGateway>>,
    pub(super) shutdown_signal: watch::Receiver<()>,
}

impl ServerBuilder {
    pub fn new(
        config: GatewayConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            gateway: None,
            shutdown_signal,
        }
    }

    /// Overrides the default in-memory store
    pub fn gateway(
        mut self,
        gateway: Arc<dyn ResourceGateway>,
    ) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Spawns the Prometheus endpoint when `monitoring.prometheus_enabled` is set
    pub fn start_metrics_server(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        if self.config.monitoring.prometheus_enabled {
            let port = self.config.monitoring.prometheus_port;
            info!(port, "starting metrics server");
            tokio::spawn(async move {
                metrics::start_server(port, shutdown_signal).await;
            });
        } else {
            debug!("prometheus disabled, metrics server not started");
        }
        self
    }

    pub fn build(self) -> Server {
        let gateway = self.gateway.unwrap_or_else(|| {
            debug!(
                buffer = self.config.watch.subscription_buffer_size,
                "using in-memory resource store"
            );
            Arc::new(MemoryGateway::new(self.config.watch.subscription_buffer_size))
        });

        let state = ApiState::new(gateway, self.config.watch.clone());
        Server {
            config: self.config,
            state,
            shutdown_signal: self.shutdown_signal,
        }
    }
}
