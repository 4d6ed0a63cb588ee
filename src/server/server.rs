//! Viewer server
//!
//! Owns the registry, the watch adapter, and the HTTP listener. Shutdown has
//! two phases: the registry closes every live-reload sink (which ends the
//! long-lived streams), then in-flight requests get a grace period to finish.

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;

use super::api::create_router;
use super::config::{ConfigError, ServerConfig};
use super::registry::Registry;
use super::watcher::{run_watch_loop, WatchAdapter, WatchEvent};

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// File registry and event bus
    pub registry: Arc<Registry>,

    /// Configuration
    pub config: ServerConfig,

    /// Server start time
    pub start_time: Instant,
}

// ============================================================================
// Server
// ============================================================================

/// The viewer server
pub struct MoServer {
    config: ServerConfig,
    state: AppState,
    watch: Option<(Arc<WatchAdapter>, mpsc::Receiver<WatchEvent>)>,
}

impl MoServer {
    /// Create a server. A watcher that cannot be created only costs live
    /// reload; the server still runs.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let mut registry = Registry::new(config.sink_capacity);
        let mut watch = None;

        if config.watch_files {
            match WatchAdapter::new() {
                Ok((adapter, events)) => {
                    let adapter = Arc::new(adapter);
                    registry = registry.with_watcher(adapter.clone());
                    watch = Some((adapter, events));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "live reload disabled");
                }
            }
        }

        let state = AppState {
            registry: Arc::new(registry),
            config: config.clone(),
            start_time: Instant::now(),
        };

        Ok(Self {
            config,
            state,
            watch,
        })
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Get the registry, e.g. to add the initial files before serving
    pub fn registry(&self) -> Arc<Registry> {
        self.state.registry.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.address();
        TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind { address, source })
    }

    /// Serve on `listener` until `shutdown` resolves and the drain completes
    /// or the grace period runs out
    pub async fn serve(
        mut self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let registry = self.registry();
        let grace = self.config.shutdown_grace();

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "serving");
        }

        if let Some((adapter, events)) = self.watch.take() {
            tokio::spawn(run_watch_loop(registry.clone(), adapter, events));
        }

        let (draining_tx, draining_rx) = oneshot::channel();
        let signal = async move {
            shutdown.await;
            tracing::info!("shutting down");
            registry.close_all_subscribers().await;
            let _ = draining_tx.send(());
        };

        let server = axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .into_future();
        tokio::pin!(server);

        tokio::select! {
            biased;
            result = &mut server => {
                return result.map_err(ServerError::Serve);
            }
            Ok(()) = draining_rx => {}
        }

        match tokio::time::timeout(grace, &mut server).await {
            Ok(result) => result.map_err(ServerError::Serve)?,
            Err(_) => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "grace period elapsed, dropping open connections"
                );
            }
        }

        tracing::info!(
            uptime_secs = self.state.start_time.elapsed().as_secs(),
            "server stopped"
        );
        Ok(())
    }

    /// Bind and serve with graceful shutdown
    pub async fn start_with_shutdown(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
