//! Request/response pipeline.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → stage 0 on_request ─┐
//!     → stage 1 on_request  │ Continue: next stage
//!     → stage n on_request  │ ShortCircuit / Fail: stop, build response
//!     → dispatcher (application router)
//! outbound response
//!     → stage n..0 on_response (only stages whose on_request continued)
//!     → caller
//! ```
//!
//! # Design Decisions
//! - Stages are values behind one trait; no handler-calls-next inheritance chain
//! - Request-scoped data (principal, signed params) rides in request extensions
//! - Stages hold only immutable configuration, so one pipeline serves all requests

pub mod error;
pub mod middleware;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request};
use axum::response::{IntoResponse, Response};

use crate::auth::TokenService;
use crate::config::PipelineConfig;
use crate::observability::metrics;
use crate::stages::{AuthenticationStage, CompressionStage, RequestSignatureStage, StageSetupError};

pub use error::PipelineError;
pub use middleware::pipeline_middleware;

/// What a stage decided about a request.
pub enum Outcome {
    /// Hand the (possibly modified) request to the next stage.
    Continue(Request<Body>),
    /// Stop here and answer with this response.
    ShortCircuit(Response),
    /// Stop here with a typed failure.
    Fail(PipelineError),
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Continue(req) => f.debug_tuple("Continue").field(&req.uri()).finish(),
            Outcome::ShortCircuit(resp) => f.debug_tuple("ShortCircuit").field(&resp.status()).finish(),
            Outcome::Fail(err) => f.debug_tuple("Fail").field(err).finish(),
        }
    }
}

/// One unit of the request pipeline.
pub trait Stage: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    fn on_request(&self, request: Request<Body>) -> Outcome;

    /// Transform the response on the way out. `request_headers` are the headers the
    /// caller originally sent.
    fn on_response(&self, _request_headers: &HeaderMap, response: Response) -> Response {
        response
    }
}

/// Ordered chain of stages in front of an application dispatcher.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Compression → RequestSignature → Authentication, configured from `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, StageSetupError> {
        let tokens = Arc::new(TokenService::from_config(&config.token)?);
        Self::standard(config, tokens)
    }

    /// The standard stage order, sharing `tokens` with the caller (e.g. a login handler).
    pub fn standard(config: &PipelineConfig, tokens: Arc<TokenService>) -> Result<Self, StageSetupError> {
        Ok(Self::new(vec![
            Box::new(CompressionStage::from_config(&config.compression)?),
            Box::new(RequestSignatureStage::from_config(&config.signature)),
            Box::new(AuthenticationStage::new(tokens)),
        ]))
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run `request` through every stage, then `dispatch`, then back out.
    pub async fn run<F, Fut>(&self, request: Request<Body>, dispatch: F) -> Response
    where
        F: FnOnce(Request<Body>) -> Fut,
        Fut: Future<Output = Response>,
    {
        let request_headers = request.headers().clone();
        let mut passed = 0;
        let mut outcome = Outcome::Continue(request);

        for stage in &self.stages {
            let Outcome::Continue(current) = outcome else {
                break;
            };
            outcome = stage.on_request(current);
            match &outcome {
                Outcome::Continue(_) => passed += 1,
                Outcome::ShortCircuit(response) => {
                    metrics::record_rejection(stage.name(), response.status().as_u16());
                }
                Outcome::Fail(err) => {
                    tracing::debug!(stage = stage.name(), error = %err, "Stage rejected request");
                    metrics::record_rejection(stage.name(), err.status().as_u16());
                }
            }
        }

        let mut response = match outcome {
            Outcome::Continue(request) => dispatch(request).await,
            Outcome::ShortCircuit(response) => response,
            Outcome::Fail(err) => err.into_response(),
        };

        for stage in self.stages[..passed].iter().rev() {
            response = stage.on_response(&request_headers, response);
        }
        response
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("stages", &self.stage_names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};
    use std::sync::Mutex;

    /// Records the order in which hooks run.
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        verdict: fn(Request<Body>) -> Outcome,
    }

    impl Stage for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn on_request(&self, request: Request<Body>) -> Outcome {
            self.log.lock().unwrap().push(format!("in:{}", self.name));
            (self.verdict)(request)
        }

        fn on_response(&self, _headers: &HeaderMap, mut response: Response) -> Response {
            self.log.lock().unwrap().push(format!("out:{}", self.name));
            response
                .headers_mut()
                .append("x-stages", HeaderValue::from_static(self.name));
            response
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>, verdict: fn(Request<Body>) -> Outcome) -> Box<dyn Stage> {
        Box::new(Recorder { name, log: log.clone(), verdict })
    }

    fn request() -> Request<Body> {
        Request::builder().uri("/api/values").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_stages_run_in_order_and_unwind_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![
            recorder("a", &log, Outcome::Continue),
            recorder("b", &log, Outcome::Continue),
        ]);

        let dispatch_log = log.clone();
        let response = pipeline
            .run(request(), |_req| async move {
                dispatch_log.lock().unwrap().push("dispatch".into());
                StatusCode::OK.into_response()
            })
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), ["in:a", "in:b", "dispatch", "out:b", "out:a"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_dispatch_and_later_stages() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![
            recorder("a", &log, Outcome::Continue),
            recorder("b", &log, |_| Outcome::ShortCircuit(StatusCode::IM_A_TEAPOT.into_response())),
            recorder("c", &log, Outcome::Continue),
        ]);

        let dispatch_log = log.clone();
        let response = pipeline
            .run(request(), |_req| async move {
                dispatch_log.lock().unwrap().push("dispatch".into());
                StatusCode::OK.into_response()
            })
            .await;

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(*log.lock().unwrap(), ["in:a", "in:b", "out:a"]);
        let stages: Vec<_> = response
            .headers()
            .get_all("x-stages")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(stages, ["a"]);
    }

    #[tokio::test]
    async fn test_fail_maps_to_status() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![recorder("a", &log, |_| {
            Outcome::Fail(PipelineError::Validation("missing nonce".into()))
        })]);

        let response = pipeline
            .run(request(), |_req| async { StatusCode::OK.into_response() })
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_default_pipeline_order() {
        let pipeline = Pipeline::from_config(&PipelineConfig::default()).unwrap();
        assert_eq!(pipeline.stage_names(), ["compression", "request_signature", "authentication"]);
    }
}
