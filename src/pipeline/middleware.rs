//! axum glue: runs the pipeline in front of the wrapped router.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};

use crate::pipeline::Pipeline;

pub async fn pipeline_middleware(
    State(pipeline): State<Arc<Pipeline>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    pipeline.run(request, |req| next.run(req)).await
}

/// Wrap every route of `router` with `pipeline`.
pub fn with_pipeline<S>(router: Router<S>, pipeline: Arc<Pipeline>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(pipeline, pipeline_middleware))
}
