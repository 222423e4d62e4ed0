//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pipeline_rejections_total` (counter): requests stopped by a stage, by stage and status
//! - `pipeline_codec_applied_total` (counter): body transforms, by direction and encoding

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

pub fn record_rejection(stage: &'static str, status: u16) {
    counter!("pipeline_rejections_total", "stage" => stage, "status" => status.to_string())
        .increment(1);
}

pub fn record_codec_applied(direction: &'static str, encoding: &'static str) {
    counter!("pipeline_codec_applied_total", "direction" => direction, "encoding" => encoding)
        .increment(1);
}

/// Install the Prometheus recorder with its own HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}
