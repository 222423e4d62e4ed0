//! Signed-request parameter gate.
//!
//! Requests outside the exempt set must carry `nonce` (i32), `timestamp` (i32, seconds) and a
//! non-blank `signature` in the query string. Only the shape is checked: the signature is not
//! verified against a shared secret and nonces are not remembered, so replays pass.

use std::collections::HashSet;

use axum::body::Body;
use axum::http::Request;

use crate::config::SignatureConfig;
use crate::pipeline::{Outcome, PipelineError, Stage};
use crate::stages::query_param;

/// Parameters of a signed request, parsed fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequestParams {
    pub nonce: i32,
    pub timestamp: i32,
    pub signature: String,
}

impl SignedRequestParams {
    pub fn from_request<B>(request: &Request<B>) -> Result<Self, PipelineError> {
        let uri = request.uri();
        let nonce = integer_param(uri, "nonce")?;
        let timestamp = integer_param(uri, "timestamp")?;
        let signature = query_param(uri, "signature")
            .ok_or_else(|| PipelineError::Validation("missing signature".into()))?;
        Ok(Self {
            nonce,
            timestamp,
            signature,
        })
    }
}

fn integer_param(uri: &axum::http::Uri, name: &str) -> Result<i32, PipelineError> {
    let raw = query_param(uri, name)
        .ok_or_else(|| PipelineError::Validation(format!("missing {}", name)))?;
    raw.trim()
        .parse::<i32>()
        .map_err(|_| PipelineError::Validation(format!("{} must be a 32-bit integer", name)))
}

pub struct RequestSignatureStage {
    exempt_paths: HashSet<String>,
}

impl RequestSignatureStage {
    pub fn new<I, S>(exempt_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exempt_paths: exempt_paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &SignatureConfig) -> Self {
        Self::new(config.exempt_paths.iter().cloned())
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.contains(path)
    }
}

impl Stage for RequestSignatureStage {
    fn name(&self) -> &'static str {
        "request_signature"
    }

    fn on_request(&self, mut request: Request<Body>) -> Outcome {
        if self.is_exempt(request.uri().path()) {
            return Outcome::Continue(request);
        }

        match SignedRequestParams::from_request(&request) {
            Ok(params) => {
                request.extensions_mut().insert(params);
                Outcome::Continue(request)
            }
            Err(err) => {
                tracing::warn!(path = %request.uri().path(), error = %err, "Rejected unsigned request");
                Outcome::Fail(err)
            }
        }
    }
}
