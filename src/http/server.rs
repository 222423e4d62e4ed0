//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the token service and the stage pipeline from configuration
//! - Assemble the axum Router with the demo handlers
//! - Wrap every route in the pipeline, then in the access-log trace layer
//! - Serve until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::auth::TokenService;
use crate::config::PipelineConfig;
use crate::http::handlers;
use crate::pipeline::{middleware::with_pipeline, Pipeline};
use crate::stages::StageSetupError;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
}

/// HTTP server hosting the demo application behind the pipeline.
pub struct HttpServer {
    router: Router,
    config: PipelineConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: PipelineConfig) -> Result<Self, StageSetupError> {
        let tokens = Arc::new(TokenService::from_config(&config.token)?);
        let pipeline = Arc::new(Pipeline::standard(&config, tokens.clone())?);

        tracing::info!(
            stages = ?pipeline.stage_names(),
            codecs = ?config.compression.codecs,
            "Pipeline assembled"
        );

        let router = Self::build_router(AppState { tokens }, pipeline);
        Ok(Self { router, config })
    }

    fn build_router(state: AppState, pipeline: Arc<Pipeline>) -> Router {
        let app = Router::new()
            .route("/api/login", post(handlers::login))
            .route("/api/logout", post(handlers::logout))
            .route("/api/values", get(handlers::list_values).post(handlers::add_value))
            .route("/api/values/{id}", get(handlers::get_content))
            .route("/api/echo", post(handlers::echo))
            .with_state(state);

        with_pipeline(app, pipeline).layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for in-process use (tests, embedding).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` resolves, then drain open connections.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}
