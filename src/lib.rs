//! Request pipeline library: content-encoding negotiation, signed-request gating and bearer
//! token authentication as composable stages in front of an axum application.

pub mod auth;
pub mod codec;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod stages;

pub use config::schema::PipelineConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::{Outcome, Pipeline, PipelineError, Stage};
