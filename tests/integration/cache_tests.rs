//! Cache behaviour tests.
//!
//! Tests verify:
//! - Second request is served from the cache with identical bytes
//! - Concurrent misses for one path produce exactly one artifact
//! - Cached artifacts are authoritative once written
//! - Conditional requests are answered with 304

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};

use nimage::{CacheStore, ImageService};

use super::test_utils::{body_bytes, get, header, jpeg_bytes, png_bytes, send, TestEnv};

#[tokio::test]
async fn test_second_request_is_cache_hit() {
    let env = TestEnv::new();
    env.write_original("photos/a.jpg", &jpeg_bytes(32, 32));
    let router = env.router();

    let first = get(&router, "/photos/a.jpg").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header(&first, "x-cache-hit"), "false");
    let first_body = body_bytes(first).await;

    let second = get(&router, "/photos/a.jpg").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header(&second, "x-cache-hit"), "true");
    let second_body = body_bytes(second).await;

    assert_eq!(first_body, second_body);
}

#[tokio::test]
async fn test_cached_artifact_survives_original_removal() {
    let env = TestEnv::new();
    let original = env.write_original("gone.png", &png_bytes(8, 8));
    let router = env.router();

    let first = body_bytes(get(&router, "/gone.png").await).await;
    std::fs::remove_file(&original).unwrap();

    let second = get(&router, "/gone.png").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header(&second, "x-cache-hit"), "true");
    assert_eq!(body_bytes(second).await, first);
}

#[tokio::test]
async fn test_changed_original_keeps_stale_artifact() {
    let env = TestEnv::new();
    env.write_original("a.jpg", &jpeg_bytes(16, 16));
    let router = env.router();

    let first = body_bytes(get(&router, "/a.jpg").await).await;

    // No invalidation on source change; only /clearcache drops artifacts
    env.write_original("a.jpg", &jpeg_bytes(32, 8));
    let second = body_bytes(get(&router, "/a.jpg").await).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_concurrent_misses_write_one_artifact() {
    let env = TestEnv::new();
    env.write_original("busy.jpg", &jpeg_bytes(128, 128));
    let router = env.router();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            let response = get(&router, "/busy.jpg").await;
            assert_eq!(response.status(), StatusCode::OK);
            body_bytes(response).await
        }));
    }

    let mut bodies = Vec::new();
    for handle in handles {
        bodies.push(handle.await.unwrap());
    }

    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
    // No leftover temp files next to the artifact
    assert_eq!(
        env.cache_entries(),
        vec![std::path::PathBuf::from("busy.jpg.webp")]
    );
}

#[tokio::test]
async fn test_concurrent_misses_convert_once() {
    let env = TestEnv::new();
    env.write_original("once.png", &png_bytes(96, 96));
    let service = Arc::new(env.service());

    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(
            async move { service.fetch("/once.png").await },
        ));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(service.conversions(), 1);
    assert_eq!(service.in_flight(), 0);
}

#[tokio::test]
async fn test_cache_shared_between_services() {
    let env = TestEnv::new();
    env.write_original("shared.jpg", &jpeg_bytes(8, 8));

    let first = env.service();
    first.fetch("/shared.jpg").await.unwrap();

    // A fresh process over the same cache folder sees the artifact
    let second = ImageService::new(&env.source_root, CacheStore::new(&env.cache_root), 80);
    let response = second.fetch("/shared.jpg").await.unwrap();
    assert!(response.cache_hit);
    assert_eq!(second.conversions(), 0);
}

#[tokio::test]
async fn test_conditional_request_not_modified() {
    let env = TestEnv::new();
    env.write_original("etag.jpg", &jpeg_bytes(8, 8));
    let router = env.router();

    let first = get(&router, "/etag.jpg").await;
    let etag = header(&first, "etag").to_string();
    let last_modified = header(&first, "last-modified").to_string();

    let request = Request::get("/etag.jpg")
        .header("if-none-match", &etag)
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(header(&response, "etag"), etag);
    assert!(body_bytes(response).await.is_empty());

    let request = Request::get("/etag.jpg")
        .header("if-modified-since", &last_modified)
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

    let request = Request::get("/etag.jpg")
        .header("if-none-match", "\"something-else\"")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_quality_changes_output() {
    let env = TestEnv::new();
    env.write_original("q.png", &png_bytes(64, 64));

    let high = ImageService::new(&env.source_root, CacheStore::new(env.cache_root.join("hi")), 95);
    let low = ImageService::new(&env.source_root, CacheStore::new(env.cache_root.join("lo")), 10);

    let high_path = high.fetch("/q.png").await.unwrap().path().to_path_buf();
    let low_path = low.fetch("/q.png").await.unwrap().path().to_path_buf();

    let high_len = std::fs::metadata(high_path).unwrap().len();
    let low_len = std::fs::metadata(low_path).unwrap().len();
    assert!(low_len <= high_len, "low {} > high {}", low_len, high_len);
}
