//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, TraceLayer access spans)
//!     → pipeline middleware (compression → signature → authentication)
//!     → handlers.rs (login / logout / values / echo)
//!     → back out through the pipeline's response hooks
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, HttpServer};
