mod builder;


pub use builder::*;
use tokio::sync::watch;
use tracing::info;

use crate::api;
use crate::api::ApiState;
use crate::Error;
use crate::GatewayConfig;
use crate::Result;

/// Assembled HTTP gateway, ready to serve
pub struct Server {
    config: GatewayConfig,
    state: ApiState,
    shutdown_signal: watch::Receiver<()>,
}

impl std::fmt::Debug for Server {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Server {
    pub fn state(&self) -> &ApiState {
        &self.state
    }

    /// Serves until the shutdown signal fires.
    ///
    /// Shutdown first cancels every open watch stream, then lets in-flight
    /// requests drain.
    pub async fn run(self) -> Result<()> {
        let routes = api::routes(self.state.clone(), self.config.server.max_body_size_in_bytes);
        let streams = self.state.shutdown.clone();
        let mut shutdown_signal = self.shutdown_signal;

        let (addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(self.config.server.listen_address, async move {
                let _ = shutdown_signal.changed().await;
                info!("shutdown signal received, closing watch streams");
                streams.cancel();
            })
            .map_err(|e| {
                Error::Fatal(format!(
                    "failed to bind {}: {}",
                    self.config.server.listen_address, e
                ))
            })?;

        info!(%addr, "deployment gateway listening");
        server.await;
        info!("deployment gateway stopped");
        Ok(())
    }
}
