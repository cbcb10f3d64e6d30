//! Device Stats - sensor reading ingestion and statistics service
//!
//! Stores 3-axis readings reported by registered devices and computes per-axis
//! min, max, count, sum and median over a time window, for a single device or
//! rolled up across all devices of a user.

pub mod analyzer;
pub mod api;
pub mod config;
pub mod error;
pub mod reading;
pub mod repository;
pub mod store;
pub mod summary;

pub use analyzer::{
    analyze_device, analyze_user, AnalysisOutcome, CompleteStatsAnalysis, DeviceStatsAnalysis,
    UserStatsAnalysis,
};
pub use config::{load_config, ApiConfig, Config, ServerConfig};
pub use error::{Result, StatsError};
pub use reading::{NewReading, Reading, StatsWindow};
pub use repository::{DeviceKey, ReadingsRepository};
pub use store::InMemoryStore;
pub use summary::{summarize, AxisSummary};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::api::{build_router, ApiState};

/// Builder for the HTTP server
pub struct ServerBuilder {
    config: Config,
    store: Option<Arc<InMemoryStore>>,
    cancel: Option<CancellationToken>,
}

impl ServerBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            cancel: None,
        }
    }

    /// Serve an existing store instead of a fresh empty one
    pub fn with_store(mut self, store: Arc<InMemoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use an externally owned shutdown token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Validate the configuration and bind the listener
    pub async fn build(self) -> Result<BoundServer> {
        self.config.validate()?;

        let addr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        );
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            StatsError::Config(format!("Failed to bind to {}: {}", addr, e))
        })?;
        let listen_addr = listener.local_addr()?;

        Ok(BoundServer {
            listener,
            listen_addr,
            state: ApiState {
                store: self.store.unwrap_or_default(),
                config: self.config.api,
                cancel: self.cancel.unwrap_or_default(),
            },
        })
    }
}

/// A server whose listener is bound but not yet serving
pub struct BoundServer {
    listener: TcpListener,
    listen_addr: SocketAddr,
    state: ApiState,
}

impl BoundServer {
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.state.cancel.clone()
    }

    /// Serve requests until ctrl-c or the cancellation token fires
    pub async fn start(self) -> Result<()> {
        let cancel = self.state.cancel.clone();

        let cancel_for_signal = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::error!("Failed to listen for ctrl-c: {}", e);
                        return;
                    }
                    tracing::info!("Shutdown signal received");
                    cancel_for_signal.cancel();
                }
                _ = cancel_for_signal.cancelled() => {}
            }
        });

        let router = build_router(self.state);
        tracing::info!("Device stats service listening on http://{}", self.listen_addr);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
            })
            .await?;

        tracing::info!("Device stats service stopped");
        Ok(())
    }
}

/// Run the service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    ServerBuilder::new(config).build().await?.start().await
}
