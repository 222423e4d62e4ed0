//! Content-encoding negotiation.
//!
//! Inbound: the first token of `Content-Encoding` selects a decoder; the request body is
//! replaced with a lazily decoding one. Outbound: the first token of the caller's
//! `Accept-Encoding` selects an encoder for the response body. Unknown tokens pass through.
//!
//! Negotiation is deliberately first-token only: no `q=` weighting, no fallback to a later
//! token even when the first one is unregistered.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH};
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::response::Response;
use http_body::Body as _;

use crate::codec::{compress_body, decompress_body, CodecRegistry};
use crate::config::CompressionConfig;
use crate::observability::metrics;
use crate::pipeline::{Outcome, Stage};
use crate::stages::StageSetupError;

pub struct CompressionStage {
    registry: Arc<CodecRegistry>,
}

impl CompressionStage {
    pub fn new(registry: Arc<CodecRegistry>) -> Self {
        Self { registry }
    }

    pub fn from_config(config: &CompressionConfig) -> Result<Self, StageSetupError> {
        let registry = CodecRegistry::from_tokens(&config.codecs)?;
        Ok(Self::new(Arc::new(registry)))
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }
}

impl Stage for CompressionStage {
    fn name(&self) -> &'static str {
        "compression"
    }

    fn on_request(&self, request: Request<Body>) -> Outcome {
        let Some(token) = first_token(request.headers(), CONTENT_ENCODING) else {
            return Outcome::Continue(request);
        };
        let Some(codec) = self.registry.find(&token) else {
            tracing::debug!(encoding = %token, "Unregistered request encoding, body passed through");
            return Outcome::Continue(request);
        };

        let (mut parts, body) = request.into_parts();
        strip_first_token(&mut parts.headers);
        parts.headers.remove(CONTENT_LENGTH);

        tracing::debug!(encoding = codec.encoding(), "Decompressing request body");
        metrics::record_codec_applied("decompress", codec.encoding());
        Outcome::Continue(Request::from_parts(parts, decompress_body(body, codec)))
    }

    fn on_response(&self, request_headers: &HeaderMap, response: Response) -> Response {
        let Some(token) = first_token(request_headers, ACCEPT_ENCODING) else {
            return response;
        };
        let Some(codec) = self.registry.find(&token) else {
            tracing::debug!(encoding = %token, "Unregistered accept encoding, response passed through");
            return response;
        };
        if response.body().is_end_stream() || response.body().size_hint().exact() == Some(0) {
            return response;
        }

        let (mut parts, body) = response.into_parts();
        parts.headers.remove(CONTENT_LENGTH);
        parts
            .headers
            .append(CONTENT_ENCODING, HeaderValue::from_static(codec.encoding()));

        tracing::debug!(encoding = codec.encoding(), "Compressing response body");
        metrics::record_codec_applied("compress", codec.encoding());
        Response::from_parts(parts, compress_body(body, codec))
    }
}

/// First comma-separated token across all values of `name`, without parameters.
fn first_token(headers: &HeaderMap, name: axum::http::HeaderName) -> Option<String> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|item| item.split(';').next().unwrap_or_default().trim())
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

/// Drop the decoded (first) content-coding, keeping any that follow it.
fn strip_first_token(headers: &mut HeaderMap) {
    let remaining: Vec<String> = headers
        .get_all(CONTENT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .skip(1)
        .map(str::to_string)
        .collect();

    headers.remove(CONTENT_ENCODING);
    if !remaining.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&remaining.join(", ")) {
            headers.insert(CONTENT_ENCODING, value);
        }
    }
}
