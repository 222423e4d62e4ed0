//! Structured logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Default filter when `RUST_LOG` is unset, e.g. `request_pipeline=info,tower_http=info`.
pub fn default_filter(config: &ObservabilityConfig) -> String {
    format!(
        "request_pipeline={level},tower_http={level}",
        level = config.log_level
    )
}

/// Install the global tracing subscriber. Later calls are ignored.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(config)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
