//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Codec tokens must name built-in codecs, once each
//! - Signing key must decode and be long enough for HMAC-SHA256
//! - Exempt paths must be absolute
//! - Token lifetime and leeway must stay within what timestamp arithmetic can represent
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PipelineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use crate::codec::registry;
use crate::config::schema::PipelineConfig;

/// Shortest accepted signing key, in bytes.
pub const MIN_KEY_BYTES: usize = 16;

/// Longest accepted token lifetime: 100 years.
pub const MAX_LIFETIME_MINUTES: u64 = 100 * 366 * 24 * 60;

/// Largest accepted expiry leeway: one day.
pub const MAX_LEEWAY_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("compression.codecs: unknown encoding '{0}'")]
    UnknownCodec(String),

    #[error("compression.codecs: '{0}' listed more than once")]
    DuplicateCodec(String),

    #[error("signature.exempt_paths: '{0}' must start with '/'")]
    RelativeExemptPath(String),

    #[error("token.signing_key is not valid base64")]
    SigningKeyEncoding,

    #[error("token.signing_key must decode to at least 16 bytes, got {0}")]
    SigningKeyTooShort(usize),

    #[error("token.lifetime_minutes must be greater than zero")]
    ZeroLifetime,

    #[error("token.lifetime_minutes {0} exceeds the 100 year maximum")]
    LifetimeTooLong(u64),

    #[error("token.leeway_secs {0} exceeds the one day maximum")]
    LeewayTooLarge(u64),
}

pub fn validate_config(config: &PipelineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let mut seen = HashSet::new();
    for token in &config.compression.codecs {
        let key = token.trim().to_ascii_lowercase();
        if registry::builtin(&key).is_none() {
            errors.push(ValidationError::UnknownCodec(token.clone()));
        } else if !seen.insert(key) {
            errors.push(ValidationError::DuplicateCodec(token.clone()));
        }
    }

    for path in &config.signature.exempt_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::RelativeExemptPath(path.clone()));
        }
    }

    match STANDARD.decode(config.token.signing_key.trim()) {
        Ok(key) if key.len() < MIN_KEY_BYTES => {
            errors.push(ValidationError::SigningKeyTooShort(key.len()))
        }
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::SigningKeyEncoding),
    }

    if config.token.lifetime_minutes == 0 {
        errors.push(ValidationError::ZeroLifetime);
    } else if config.token.lifetime_minutes > MAX_LIFETIME_MINUTES {
        errors.push(ValidationError::LifetimeTooLong(config.token.lifetime_minutes));
    }

    if config.token.leeway_secs > MAX_LEEWAY_SECS {
        errors.push(ValidationError::LeewayTooLarge(config.token.leeway_secs));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
