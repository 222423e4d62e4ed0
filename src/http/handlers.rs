//! Demo application behind the pipeline.
//!
//! Login issues tokens, the values endpoints require an authenticated caller, and echo returns
//! the (already decompressed) request body unchanged.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthenticatedUser;
use crate::http::server::AppState;
use crate::pipeline::PipelineError;

const KNOWN_USERS: [&str; 2] = ["User", "Admin"];
const DEMO_PASSWORD: &str = "Pass";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "Username")]
    pub username: String,
    #[serde(alias = "Password")]
    pub password: String,
}

/// `POST /api/login`
pub async fn login(State(state): State<AppState>, Json(user): Json<LoginRequest>) -> Response {
    if !KNOWN_USERS.contains(&user.username.as_str()) {
        tracing::info!(user = %user.username, "Login for unknown user");
        return (StatusCode::NOT_FOUND, Json("The user was not found.")).into_response();
    }
    if user.password != DEMO_PASSWORD {
        tracing::info!(user = %user.username, "Login with wrong password");
        return (
            StatusCode::FORBIDDEN,
            Json("The username/password combination was wrong."),
        )
            .into_response();
    }

    match state.tokens.issue(&user.username) {
        Ok(token) => {
            tracing::info!(user = %user.username, "Token issued");
            (StatusCode::OK, Json(token)).into_response()
        }
        Err(err) => PipelineError::Unexpected(err.to_string()).into_response(),
    }
}

/// `POST /api/logout`. Tokens are stateless, nothing to revoke.
pub async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// `GET /api/values`
pub async fn list_values(AuthenticatedUser(principal): AuthenticatedUser) -> Json<Vec<String>> {
    tracing::debug!(user = %principal.username(), "Listing values");
    Json(base_values(3))
}

#[derive(Debug, Deserialize)]
pub struct AddValue {
    #[serde(default)]
    pub value: String,
}

/// `POST /api/values?value=...`
pub async fn add_value(
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(params): Query<AddValue>,
) -> Json<Vec<String>> {
    tracing::debug!(user = %principal.username(), "Adding value");
    let mut values = base_values(5);
    values.push(params.value);
    Json(values)
}

fn base_values(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("Value{}", n)).collect()
}

const DEMO_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>lz4</title></head>\n<body>\n\
<p>Request this page with <code>Accept-Encoding: lz4</code> to receive an LZ4 frame.</p>\n\
</body>\n</html>\n";

const DEMO_SCRIPT: &str = "function isBlank(s) {\n    return !s || s.trim().length === 0;\n}\n";

/// `GET /api/values/{id}`: small static assets, useful for observing response compression.
pub async fn get_content(Path(id): Path<i32>) -> Response {
    let (content_type, body) = match id {
        1 => ("text/html; charset=utf-8", DEMO_PAGE),
        2 => ("application/javascript; charset=utf-8", DEMO_SCRIPT),
        _ => return (StatusCode::NOT_FOUND, "Not Found").into_response(),
    };
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// `POST /api/echo`
pub async fn echo(body: Bytes) -> Bytes {
    body
}
