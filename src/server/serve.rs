//! Streaming file responses.
//!
//! Artifacts and pass-through originals are streamed from disk rather than
//! buffered. Responses carry validators (`Last-Modified`, `ETag`) and answer
//! conditional requests with `304 Not Modified`.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Response header reporting whether the artifact was already cached.
pub const CACHE_HIT_HEADER: HeaderName = HeaderName::from_static("x-cache-hit");

/// Stream a file as an HTTP response.
///
/// # Arguments
///
/// * `path` - File to stream
/// * `content_type` - Value of the `Content-Type` header
/// * `cache_hit` - Value of the `X-Cache-Hit` header
/// * `cache_max_age` - `Cache-Control` max-age in seconds
/// * `request_headers` - Incoming headers, for conditional requests
///
/// # Errors
///
/// Returns the I/O error if the file cannot be opened or stat'ed.
pub async fn serve_file(
    path: &Path,
    content_type: &'static str,
    cache_hit: bool,
    cache_max_age: u32,
    request_headers: &HeaderMap,
) -> std::io::Result<Response> {
    let file = File::open(path).await?;
    let metadata = file.metadata().await?;
    let modified = metadata.modified().ok();
    let etag = modified.map(|m| entity_tag(m, metadata.len()));

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    insert(
        &mut headers,
        header::CACHE_CONTROL,
        format!("public, max-age={}", cache_max_age),
    );
    headers.insert(CACHE_HIT_HEADER, HeaderValue::from_static(bool_str(cache_hit)));
    if let Some(modified) = modified {
        insert(&mut headers, header::LAST_MODIFIED, httpdate::fmt_http_date(modified));
    }
    if let Some(ref etag) = etag {
        insert(&mut headers, header::ETAG, etag.clone());
    }

    if is_not_modified(request_headers, etag.as_deref(), modified) {
        headers.remove(header::CONTENT_TYPE);
        return Ok((StatusCode::NOT_MODIFIED, headers).into_response());
    }

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((StatusCode::OK, headers, body).into_response())
}

/// Weak validator from modification time and size.
fn entity_tag(modified: SystemTime, len: u64) -> String {
    let nanos = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("\"{:x}-{:x}\"", nanos, len)
}

/// Evaluate `If-None-Match`, falling back to `If-Modified-Since`.
fn is_not_modified(
    request_headers: &HeaderMap,
    etag: Option<&str>,
    modified: Option<SystemTime>,
) -> bool {
    if let Some(if_none_match) = request_headers.get(header::IF_NONE_MATCH) {
        let Ok(value) = if_none_match.to_str() else {
            return false;
        };
        return value.trim() == "*"
            || etag.is_some_and(|etag| {
                value
                    .split(',')
                    .map(|candidate| candidate.trim().trim_start_matches("W/"))
                    .any(|candidate| candidate == etag)
            });
    }

    let Some(modified) = modified else {
        return false;
    };
    request_headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| httpdate::parse_http_date(value).ok())
        .is_some_and(|since| truncate_to_secs(modified) <= since)
}

/// HTTP dates have one-second resolution.
fn truncate_to_secs(time: SystemTime) -> SystemTime {
    time.duration_since(UNIX_EPOCH)
        .map(|d| UNIX_EPOCH + std::time::Duration::from_secs(d.as_secs()))
        .unwrap_or(time)
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: String) {
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(name, value);
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
