//! API integration tests for image conversion and error handling.
//!
//! Tests verify:
//! - JPEG and PNG originals are served as WebP and cached
//! - WebP originals are passed through untouched
//! - Error cases (missing file, unsupported content, corrupt data, traversal)
//! - HTTP response codes and headers

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};

use super::test_utils::{
    body_bytes, get, header, is_webp, jpeg_bytes, png_bytes, png_rgba_bytes, send, webp_bytes,
    webp_dimensions, TestEnv,
};

// =============================================================================
// Conversion
// =============================================================================

#[tokio::test]
async fn test_jpeg_served_as_webp() {
    let env = TestEnv::new();
    env.write_original("photos/a.jpg", &jpeg_bytes(64, 48));
    let router = env.router();

    let response = get(&router, "/photos/a.jpg").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "image/webp");
    assert_eq!(header(&response, "x-cache-hit"), "false");
    assert_eq!(header(&response, "cache-control"), "public, max-age=600");

    let body = body_bytes(response).await;
    assert!(is_webp(&body));
    assert_eq!(webp_dimensions(&body), (64, 48));

    let artifact = env.artifact("photos/a.jpg");
    assert!(artifact.is_file(), "artifact should be cached at {:?}", artifact);
    assert_eq!(std::fs::read(&artifact).unwrap(), body.to_vec());
}

#[tokio::test]
async fn test_png_served_as_webp() {
    let env = TestEnv::new();
    env.write_original("b.png", &png_bytes(20, 10));
    let router = env.router();

    let response = get(&router, "/b.png").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "image/webp");
    let body = body_bytes(response).await;
    assert_eq!(webp_dimensions(&body), (20, 10));
    assert!(env.artifact("b.png").is_file());
}

#[tokio::test]
async fn test_png_with_alpha_served_as_webp() {
    let env = TestEnv::new();
    env.write_original("alpha.png", &png_rgba_bytes(16, 16));
    let router = env.router();

    let response = get(&router, "/alpha.png").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    assert!(is_webp(&body));
    assert_eq!(webp_dimensions(&body), (16, 16));
}

#[tokio::test]
async fn test_detection_ignores_extension() {
    let env = TestEnv::new();
    // PNG bytes behind a .jpg name still convert
    env.write_original("mislabelled.jpg", &png_bytes(8, 8));
    let router = env.router();

    let response = get(&router, "/mislabelled.jpg").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(is_webp(&body_bytes(response).await));
}

#[tokio::test]
async fn test_percent_encoded_path() {
    let env = TestEnv::new();
    env.write_original("my photo.jpg", &jpeg_bytes(8, 8));
    let router = env.router();

    let response = get(&router, "/my%20photo.jpg").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(env.artifact("my photo.jpg").is_file());
}

#[tokio::test]
async fn test_head_request() {
    let env = TestEnv::new();
    env.write_original("a.jpg", &jpeg_bytes(8, 8));
    let router = env.router();

    let request = Request::builder()
        .method(Method::HEAD)
        .uri("/a.jpg")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "image/webp");
    assert!(body_bytes(response).await.is_empty());
}

// =============================================================================
// Pass-through
// =============================================================================

#[tokio::test]
async fn test_webp_original_passed_through() {
    let env = TestEnv::new();
    let original = webp_bytes(12, 12);
    env.write_original("already.webp", &original);
    let router = env.router();

    let response = get(&router, "/already.webp").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "image/webp");
    assert_eq!(header(&response, "x-cache-hit"), "false");
    assert_eq!(body_bytes(response).await.to_vec(), original);

    // Nothing is cached for pass-through
    assert!(env.cache_entries().is_empty());
}

// =============================================================================
// Error Cases
// =============================================================================

#[tokio::test]
async fn test_missing_original_returns_404() {
    let env = TestEnv::new();
    let router = env.router();

    let response = get(&router, "/missing.png").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(header(&response, "content-type"), "application/json");

    let body = body_bytes(response).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status"], 404);
    assert!(env.cache_entries().is_empty());
}

#[tokio::test]
async fn test_directory_returns_404() {
    let env = TestEnv::new();
    env.write_original("photos/a.jpg", &jpeg_bytes(8, 8));
    let router = env.router();

    let response = get(&router, "/photos").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&router, "/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_text_with_image_extension_returns_400() {
    let env = TestEnv::new();
    env.write_original("fake.jpg", b"this is not an image at all\n");
    let router = env.router();

    let response = get(&router, "/fake.jpg").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_bytes(response).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "unsupported_format");
    assert!(!env.artifact("fake.jpg").exists());
}

#[tokio::test]
async fn test_unsupported_image_type_returns_400() {
    let env = TestEnv::new();
    env.write_original("anim.gif", b"GIF89a\x01\x00\x01\x00\x00\x00\x00;");
    env.write_original("empty.png", b"");
    let router = env.router();

    let response = get(&router, "/anim.gif").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&router, "/empty.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(env.cache_entries().is_empty());
}

#[tokio::test]
async fn test_corrupt_jpeg_returns_500() {
    let env = TestEnv::new();
    let mut corrupt = vec![0xFF, 0xD8, 0xFF, 0xE0];
    corrupt.extend_from_slice(&[0x00; 4]);
    env.write_original("broken.jpg", &corrupt);
    let router = env.router();

    let response = get(&router, "/broken.jpg").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_bytes(response).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "decode_error");
    assert!(!env.artifact("broken.jpg").exists());
}

#[tokio::test]
async fn test_path_traversal_returns_403() {
    let env = TestEnv::new();
    // A file just outside the source root
    std::fs::write(
        env.source_root.parent().unwrap().join("secret.jpg"),
        jpeg_bytes(4, 4),
    )
    .unwrap();
    let router = env.router();

    for uri in ["/%2e%2e/secret.jpg", "/photos/%2E%2E/%2E%2E/secret.jpg"] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "uri {}", uri);
    }
    assert!(env.cache_entries().is_empty());
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let env = TestEnv::new();
    let router = env.router();

    let response = get(&router, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}
