//! scened - Gothic Chronicle scene image daemon
//!
//! Resolves a room and a narrative state string into a prompt and a
//! deterministic seed, generates the scene image through an external model,
//! and caches the bytes behind a stable URL.

pub mod api;
pub mod config;
pub mod hashing;
pub mod images;
pub mod scene;
pub mod workers_ai;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use api::AppState;
pub use config::Config;
use images::{CacheStore, ImagePipeline, MemoryCache};
use scene::ScenePolicy;
use workers_ai::{ImageGenerator, WorkersAiClient};

/// The scened server instance
pub struct Server {
    config: Arc<Config>,
    pipeline: ImagePipeline,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a server with the in-memory cache and the configured
    /// Workers AI generator (absent without credentials)
    pub async fn new(config: Config) -> Result<Self> {
        let cache = Arc::new(MemoryCache::from_config(&config.cache));
        let generator = WorkersAiClient::from_config(&config.workers_ai)?
            .map(|client| Arc::new(client) as Arc<dyn ImageGenerator>);

        Self::with_backends(config, cache, generator)
    }

    /// Create a server with explicit cache and generator backends
    pub fn with_backends(
        config: Config,
        cache: Arc<dyn CacheStore>,
        generator: Option<Arc<dyn ImageGenerator>>,
    ) -> Result<Self> {
        let policy = ScenePolicy::new(config.scene.clone())?;
        let pipeline =
            ImagePipeline::new(cache, generator, Arc::new(policy), config.model.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config: Arc::new(config),
            pipeline,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Build the router
    fn router(&self) -> Router {
        api::router(AppState {
            config: self.config.clone(),
            pipeline: self.pipeline.clone(),
        })
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("scened listening on {}", local_addr);
        info!(
            "Model {}; landmark rooms: [{}]",
            self.config.model,
            self.pipeline
                .policy()
                .registry()
                .rooms()
                .collect::<Vec<_>>()
                .join(", ")
        );
        if !self.pipeline.has_generator() {
            warn!("No image generator configured; /api/image requests will fail");
        }

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        info!("scened shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
