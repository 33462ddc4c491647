#![cfg(feature = "web")]

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use image_similarity::{create_router, AppState, Config, Embedder, UploadResponse};
use serde_json::Value;
use tower::ServiceExt;

use common::{png_bytes, solid_image, Broken, ChannelMeans, MultipartBody};

fn app(embedder: Arc<dyn Embedder>) -> Router {
    create_router(AppState::new(embedder))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn upload_request(body: MultipartBody) -> Request<Body> {
    let (content_type, body) = body.finish();
    Request::builder()
        .method("POST")
        .uri("/upload_image")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_root() {
    let request = Request::get("/").body(Body::empty()).unwrap();
    let (status, _, body) = send(app(Arc::new(ChannelMeans)), request).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!({"message": "Hello World"}));
}

#[tokio::test]
async fn test_health_check() {
    let request = Request::get("/health_check").body(Body::empty()).unwrap();
    let (status, headers, body) = send(app(Arc::new(ChannelMeans)), request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.contains_key("x-request-id"));
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!({"status": "OK"}));
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let request = Request::get("/health_check")
        .header(header::ORIGIN, "http://dashboard.example")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(app(Arc::new(ChannelMeans)), request).await;

    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_upload_returns_embeddings_in_upload_order() {
    let body = MultipartBody::new()
        .file("reference_image", "ref.png", "image/png", &png_bytes([255, 0, 0]))
        .file("images", "zebra.png", "image/png", &png_bytes([0, 255, 0]))
        .file("images", "apple.png", "image/png", &png_bytes([0, 0, 255]))
        .file("images", "mango.png", "image/png", &png_bytes([255, 0, 0]));

    let (status, _, body) = send(app(Arc::new(ChannelMeans)), upload_request(body)).await;
    assert_eq!(status, StatusCode::OK);

    let response: UploadResponse = serde_json::from_slice(&body).unwrap();
    let ids: Vec<_> = response.other_embeddings.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["zebra.png", "apple.png", "mango.png"]);

    assert_eq!(response.reference_embedding.len(), 3);
    assert!(response.other_embeddings.iter().all(|c| c.embedding.len() == 3));
    // Same pixels, same embedding
    assert_eq!(response.other_embeddings[2].embedding, response.reference_embedding);
}

#[tokio::test]
async fn test_upload_ignores_unknown_fields() {
    let body = MultipartBody::new()
        .text("comment", "ignored")
        .file("reference_image", "ref.png", "image/png", &png_bytes([1, 2, 3]))
        .file("images", "one.png", "image/png", &png_bytes([4, 5, 6]));

    let (status, _, body) = send(app(Arc::new(ChannelMeans)), upload_request(body)).await;
    assert_eq!(status, StatusCode::OK);

    let response: UploadResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.other_embeddings.len(), 1);
}

#[tokio::test]
async fn test_upload_non_image_is_bad_request() {
    let body = MultipartBody::new()
        .file("reference_image", "ref.png", "image/png", &png_bytes([255, 0, 0]))
        .file("images", "notes.txt", "text/plain", b"just some text");

    let (status, _, body) = send(app(Arc::new(ChannelMeans)), upload_request(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let json: Value = serde_json::from_slice(&body).unwrap();
    let error = json["error"].as_str().unwrap();
    assert!(error.contains("Invalid image file"), "{}", error);
}

#[tokio::test]
async fn test_upload_non_image_reference_is_bad_request() {
    let body = MultipartBody::new()
        .file("reference_image", "ref.txt", "text/plain", b"not a picture")
        .file("images", "a.png", "image/png", &png_bytes([0, 0, 0]));

    let (status, _, _) = send(app(Arc::new(ChannelMeans)), upload_request(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_without_candidates_is_unprocessable() {
    let body = MultipartBody::new()
        .file("reference_image", "ref.png", "image/png", &png_bytes([255, 0, 0]));

    let (status, _, body) = send(app(Arc::new(ChannelMeans)), upload_request(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Missing form field: images");
}

#[tokio::test]
async fn test_upload_without_reference_is_unprocessable() {
    let body = MultipartBody::new()
        .file("images", "a.png", "image/png", &png_bytes([0, 0, 0]));

    let (status, _, _) = send(app(Arc::new(ChannelMeans)), upload_request(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_model_failure_is_server_error() {
    let body = MultipartBody::new()
        .file("reference_image", "ref.png", "image/png", &png_bytes([255, 0, 0]))
        .file("images", "a.png", "image/png", &png_bytes([0, 0, 0]));

    let (status, _, body) = send(app(Arc::new(Broken)), upload_request(body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let json: Value = serde_json::from_slice(&body).unwrap();
    let error = json["error"].as_str().unwrap();
    assert!(error.starts_with("An error occurred: "), "{}", error);
}

fn assert_json_error(headers: &axum::http::HeaderMap, body: &[u8]) -> String {
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let json: Value = serde_json::from_slice(body).unwrap();
    json["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_upload_without_multipart_body_is_json_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/upload_image")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"reference_image": "ref.png"}"#))
        .unwrap();

    let (status, headers, body) = send(app(Arc::new(ChannelMeans)), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = assert_json_error(&headers, &body);
    assert!(error.starts_with("Invalid upload: "), "{}", error);
}

#[tokio::test]
async fn test_upload_with_truncated_multipart_is_json_bad_request() {
    let (content_type, mut body) = MultipartBody::new()
        .file("reference_image", "ref.png", "image/png", &png_bytes([255, 0, 0]))
        .finish();
    // Drop the closing boundary
    body.truncate(body.len() / 2);

    let request = Request::builder()
        .method("POST")
        .uri("/upload_image")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();

    let (status, headers, body) = send(app(Arc::new(ChannelMeans)), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = assert_json_error(&headers, &body);
    assert!(error.starts_with("Invalid upload: "), "{}", error);
}

#[tokio::test]
async fn test_upload_over_body_limit_is_json_payload_too_large() {
    let config = Config {
        max_upload_size: 1024,
        ..Config::default()
    };
    let state = AppState::with_config(config, Arc::new(ChannelMeans));

    let body = MultipartBody::new()
        .file("reference_image", "ref.png", "image/png", &vec![0u8; 4096])
        .file("images", "a.png", "image/png", &png_bytes([0, 0, 0]));

    let (status, headers, body) = send(create_router(state), upload_request(body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    let error = assert_json_error(&headers, &body);
    assert!(error.starts_with("Upload too large: "), "{}", error);
}

#[tokio::test]
async fn test_upload_under_body_limit_is_accepted() {
    let config = Config {
        max_upload_size: 64 * 1024,
        ..Config::default()
    };
    let state = AppState::with_config(config, Arc::new(ChannelMeans));

    let body = MultipartBody::new()
        .file("reference_image", "ref.png", "image/png", &png_bytes([1, 1, 1]))
        .file("images", "a.png", "image/png", &png_bytes([0, 0, 0]));

    let (status, _, _) = send(create_router(state), upload_request(body)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_upload_extreme_aspect_ratio() {
    let mut sliver = Vec::new();
    solid_image(1, 100_000, [0, 255, 0])
        .write_to(&mut std::io::Cursor::new(&mut sliver), image::ImageFormat::Png)
        .unwrap();

    let body = MultipartBody::new()
        .file("reference_image", "ref.png", "image/png", &png_bytes([0, 255, 0]))
        .file("images", "sliver.png", "image/png", &sliver);

    let (status, _, body) = send(app(Arc::new(ChannelMeans)), upload_request(body)).await;
    assert_eq!(status, StatusCode::OK);

    let response: UploadResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.other_embeddings[0].id, "sliver.png");
    assert_eq!(response.other_embeddings[0].embedding, response.reference_embedding);
}
