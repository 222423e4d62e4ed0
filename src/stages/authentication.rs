//! Bearer token authentication.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::AUTHORIZATION;
use axum::http::Request;

use crate::auth::TokenService;
use crate::pipeline::{Outcome, PipelineError, Stage};
use crate::stages::query_param;

const BEARER_PREFIX: &str = "Bearer ";

/// Token carried by `request`: a single `Authorization` header (with or without the
/// `Bearer ` prefix) wins, else the `token` query parameter. Repeated `Authorization`
/// headers are ambiguous and ignored.
pub fn extract_token<B>(request: &Request<B>) -> Option<String> {
    let mut values = request.headers().get_all(AUTHORIZATION).iter();
    if let (Some(value), None) = (values.next(), values.next()) {
        if let Ok(value) = value.to_str() {
            let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value);
            return Some(token.to_string());
        }
    }
    query_param(request.uri(), "token")
}

/// Validates a presented token and records the principal for the rest of the request.
/// Requests without any token continue unauthenticated.
pub struct AuthenticationStage {
    tokens: Arc<TokenService>,
}

impl AuthenticationStage {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

impl Stage for AuthenticationStage {
    fn name(&self) -> &'static str {
        "authentication"
    }

    fn on_request(&self, mut request: Request<Body>) -> Outcome {
        let Some(token) = extract_token(&request) else {
            return Outcome::Continue(request);
        };

        match self.tokens.validate(&token) {
            Ok(principal) => {
                tracing::debug!(user = %principal.username(), "Request authenticated");
                request.extensions_mut().insert(principal);
                Outcome::Continue(request)
            }
            Err(err) if err.is_unexpected() => Outcome::Fail(PipelineError::Unexpected(err.to_string())),
            Err(err) => {
                tracing::warn!(path = %request.uri().path(), reason = %err, "Rejected bearer token");
                Outcome::Fail(PipelineError::Authentication(err.to_string()))
            }
        }
    }
}
