//! Cache invalidation endpoint tests.
//!
//! Tests verify:
//! - Wrong or missing keys are refused and leave the cache untouched
//! - The right key empties the cache and the next request converts again

use axum::http::StatusCode;

use nimage::RouterConfig;

use super::test_utils::{body_bytes, get, header, jpeg_bytes, TestEnv, CLEAR_KEY};

#[tokio::test]
async fn test_wrong_key_is_forbidden() {
    let env = TestEnv::new();
    env.write_original("a.jpg", &jpeg_bytes(8, 8));
    let router = env.router();
    assert_eq!(get(&router, "/a.jpg").await.status(), StatusCode::OK);
    let before = env.cache_entries();

    let response = get(&router, "/clearcache?key=wrong").await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_bytes(response).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "forbidden");
    assert_eq!(env.cache_entries(), before);
    assert!(env.artifact("a.jpg").is_file());
}

#[tokio::test]
async fn test_missing_key_is_forbidden() {
    let env = TestEnv::new();
    env.write_original("a.jpg", &jpeg_bytes(8, 8));
    let router = env.router();
    get(&router, "/a.jpg").await;

    for uri in ["/clearcache", "/clearcache?key=", "/clearcache?other=abc"] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "uri {}", uri);
    }
    assert!(env.artifact("a.jpg").is_file());
}

#[tokio::test]
async fn test_correct_key_clears_cache() {
    let env = TestEnv::new();
    env.write_original("photos/a.jpg", &jpeg_bytes(8, 8));
    env.write_original("b.jpg", &jpeg_bytes(8, 8));
    let router = env.router();
    get(&router, "/photos/a.jpg").await;
    get(&router, "/b.jpg").await;
    assert_eq!(env.cache_entries().len(), 2);

    let response = get(&router, &format!("/clearcache?key={}", CLEAR_KEY)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    assert_eq!(&body[..], b"Cache cleared successfully");
    assert!(env.cache_entries().is_empty());

    // Next request is a fresh miss
    let response = get(&router, "/photos/a.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-cache-hit"), "false");
    assert!(env.artifact("photos/a.jpg").is_file());
}

#[tokio::test]
async fn test_clear_empty_cache_succeeds() {
    let env = TestEnv::new();
    std::fs::remove_dir_all(&env.cache_root).unwrap();
    let router = env.router();

    let response = get(&router, &format!("/clearcache?key={}", CLEAR_KEY)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Clearing twice is fine too
    let response = get(&router, &format!("/clearcache?key={}", CLEAR_KEY)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_percent_encoded_key() {
    let env = TestEnv::new();
    let router = env.router_with(RouterConfig::new("a b&c"));

    let response = get(&router, "/clearcache?key=a%20b%26c").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&router, "/clearcache?key=a%20b").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_conversion_after_clear_is_deterministic() {
    let env = TestEnv::new();
    env.write_original("d.jpg", &jpeg_bytes(40, 30));
    let router = env.router();

    let first = body_bytes(get(&router, "/d.jpg").await).await;
    get(&router, &format!("/clearcache?key={}", CLEAR_KEY)).await;
    let second = body_bytes(get(&router, "/d.jpg").await).await;

    assert_eq!(first, second);
}
