//! HTTP server wiring
//!
//! Builds the shared state from configuration, layers the router and runs
//! it until the shutdown signal fires.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, ServerConfig};
use crate::refresh::RefreshOrchestrator;
use crate::render::SummaryRenderer;
use crate::storage::{open_repository, CountryRepository};

use super::api::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Country store
    pub repository: Arc<dyn CountryRepository>,

    /// Refresh pipeline
    pub orchestrator: Arc<RefreshOrchestrator>,

    /// Summary image renderer, also the source of the image path
    pub renderer: Arc<SummaryRenderer>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn CountryRepository>,
        orchestrator: Arc<RefreshOrchestrator>,
        renderer: Arc<SummaryRenderer>,
    ) -> Self {
        Self {
            repository,
            orchestrator,
            renderer,
            start_time: Instant::now(),
        }
    }

    /// Wire every component from configuration
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let repository = open_repository(&config.database.url)
            .map_err(|e| ServerError::Init(format!("failed to open database: {e}")))?;

        let renderer = Arc::new(SummaryRenderer::new(
            &config.summary.image_path,
            &config.summary.fonts_dir,
        ));

        let orchestrator = RefreshOrchestrator::from_config(config, Arc::clone(&repository), Arc::clone(&renderer))
            .map_err(|e| ServerError::Init(e.to_string()))?;

        Ok(Self::new(repository, Arc::new(orchestrator), renderer))
    }
}

// ============================================================================
// Country Server
// ============================================================================

/// HTTP front of the country store
pub struct CountryServer {
    config: ServerConfig,
    state: AppState,
}

impl CountryServer {
    /// Create a server from full configuration
    pub fn new(config: &Config) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let state = AppState::from_config(config)?;
        Ok(Self::with_state(config.server.clone(), state))
    }

    /// Create a server around an existing state
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Address the server binds to
    pub fn bind_address(&self) -> SocketAddr {
        self.config.bind_address
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Start with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{addr}: {e}")))?;

        tracing::info!("Country API listening on {}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::info!(
            uptime_secs = self.state.start_time.elapsed().as_secs(),
            "Server shutdown complete"
        );
        Ok(())
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Failed to bind: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}

// ============================================================================
// Tests
// ============================================================================
