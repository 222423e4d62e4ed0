//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the pipeline server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Content-encoding codecs.
    pub compression: CompressionConfig,

    /// Signed-request gate.
    pub signature: SignatureConfig,

    /// Bearer token issuance and validation.
    pub token: TokenConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Codec selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Encoding tokens to register, from the built-in set (gzip, deflate, lz4).
    pub codecs: Vec<String>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codecs: vec!["gzip".to_string(), "deflate".to_string(), "lz4".to_string()],
        }
    }
}

/// Signed-request configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Paths that skip the nonce/timestamp/signature check (exact match).
    pub exempt_paths: Vec<String>,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            exempt_paths: vec!["/api/login".to_string(), "/api/logout".to_string()],
        }
    }
}

/// Token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Base64 encoded HMAC-SHA256 key.
    pub signing_key: String,

    /// Token lifetime in minutes.
    pub lifetime_minutes: u64,

    /// Role claim written into every issued token.
    pub default_role: String,

    /// Clock skew tolerated on expiry, in seconds.
    pub leeway_secs: u64,
}

/// Base64 of a placeholder key. Startup warns while it is in use.
pub const PLACEHOLDER_SIGNING_KEY: &str = "Q0hBTkdFX01FX0lOX1BST0RVQ1RJT05fU0lHTklOR19LRVk=";

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            signing_key: PLACEHOLDER_SIGNING_KEY.to_string(),
            lifetime_minutes: 60 * 30,
            default_role: "Admin".to_string(),
            leeway_secs: 0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
