//! End-to-end tests: the full server on a local port, driven over HTTP.

use reqwest::header::{ACCEPT_ENCODING, AUTHORIZATION, CONTENT_ENCODING};
use reqwest::StatusCode;

use request_pipeline::codec::{compress_to_vec, decompress_to_vec, CodecRegistry};
use request_pipeline::config::PipelineConfig;

mod common;

async fn admin_token(server: &common::TestServer) -> String {
    let res = common::login(server, "Admin", "Pass").await;
    assert_eq!(res.status(), StatusCode::OK);
    res.json::<String>().await.unwrap()
}

#[tokio::test]
async fn test_login_then_authenticated_values() {
    let server = common::start_server(PipelineConfig::default()).await;
    let token = admin_token(&server).await;

    let res = common::client()
        .get(server.signed_url("/api/values"))
        .header(AUTHORIZATION, format!("Bearer {}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Vec<String>>().await.unwrap(), ["Value1", "Value2", "Value3"]);
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let server = common::start_server(PipelineConfig::default()).await;

    let res = common::client()
        .get(server.signed_url("/api/values"))
        .header(AUTHORIZATION, "Bearer garbage")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_credentials() {
    let server = common::start_server(PipelineConfig::default()).await;

    assert_eq!(common::login(&server, "Ghost", "Pass").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(common::login(&server, "User", "nope").await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unsigned_request_rejected_before_authentication() {
    let server = common::start_server(PipelineConfig::default()).await;
    let token = admin_token(&server).await;

    let res = common::client()
        .get(server.url("/api/values?nonce=abc&timestamp=1&signature=x"))
        .header(AUTHORIZATION, format!("Bearer {}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_custom_exempt_paths() {
    let mut config = PipelineConfig::default();
    config.signature.exempt_paths = vec!["/api/echo".into()];
    let server = common::start_server(config).await;

    let res = common::client()
        .post(server.url("/api/echo"))
        .body("unsigned")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "unsigned");

    // login is no longer exempt
    assert_eq!(common::login(&server, "Admin", "Pass").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lz4_round_trip_through_echo() {
    let server = common::start_server(PipelineConfig::default()).await;
    let registry = CodecRegistry::with_defaults();
    let lz4 = registry.find("lz4").unwrap();
    let payload = b"{\"message\":\"lz4 on the wire\"}".repeat(500);

    let res = common::client()
        .post(server.signed_url("/api/echo"))
        .header(CONTENT_ENCODING, "lz4")
        .header(ACCEPT_ENCODING, "lz4")
        .body(compress_to_vec(lz4.as_ref(), &payload).unwrap())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[CONTENT_ENCODING], "lz4");
    let body = res.bytes().await.unwrap();
    assert!(body.len() < payload.len());
    assert_eq!(decompress_to_vec(lz4.as_ref(), &body).unwrap(), payload);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_response_encoding_negotiation() {
    let server = common::start_server(PipelineConfig::default()).await;
    let registry = CodecRegistry::with_defaults();

    let res = common::client()
        .get(server.signed_url("/api/values/1"))
        .header(ACCEPT_ENCODING, "gzip;q=1.0, lz4")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()[CONTENT_ENCODING], "gzip");
    let body = res.bytes().await.unwrap();
    let html = decompress_to_vec(registry.find("gzip").unwrap().as_ref(), &body).unwrap();
    assert!(String::from_utf8(html).unwrap().contains("<html>"));

    let res = common::client()
        .get(server.signed_url("/api/values/1"))
        .header(ACCEPT_ENCODING, "br, gzip")
        .send()
        .await
        .unwrap();
    assert!(res.headers().get(CONTENT_ENCODING).is_none());
    assert!(res.text().await.unwrap().contains("<html>"));
}

#[tokio::test]
async fn test_disabled_codec_passes_through() {
    let mut config = PipelineConfig::default();
    config.compression.codecs = vec!["gzip".into()];
    let server = common::start_server(config).await;

    let res = common::client()
        .post(server.signed_url("/api/echo"))
        .header(CONTENT_ENCODING, "lz4")
        .header(ACCEPT_ENCODING, "lz4")
        .body("not really lz4")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(CONTENT_ENCODING).is_none());
    assert_eq!(res.text().await.unwrap(), "not really lz4");
}
