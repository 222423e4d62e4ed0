//! The concrete pipeline stages.
//!
//! # Data Flow
//! ```text
//! request
//!     → compression.rs     (decode body per Content-Encoding; encode response per Accept-Encoding)
//!     → signature.rs       (nonce / timestamp / signature shape check, exempt paths bypass)
//!     → authentication.rs  (bearer token → Principal in request extensions, or 401/500)
//!     → application
//! ```

pub mod authentication;
pub mod compression;
pub mod signature;

use axum::http::Uri;
use thiserror::Error;

use crate::auth::TokenError;
use crate::codec::registry::RegistryError;

pub use authentication::AuthenticationStage;
pub use compression::CompressionStage;
pub use signature::{RequestSignatureStage, SignedRequestParams};

/// Errors raised while building stages from configuration.
#[derive(Debug, Error)]
pub enum StageSetupError {
    #[error("Codec registry: {0}")]
    Codec(#[from] RegistryError),

    #[error("Token service: {0}")]
    Token(#[from] TokenError),
}

/// First value of query parameter `name`, matched case-insensitively.
/// Blank values count as absent.
pub(crate) fn query_param(uri: &Uri, name: &str) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.trim().is_empty())
}
