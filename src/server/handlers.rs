//! HTTP request handlers for the nimage API.
//!
//! This module contains the Axum handlers for serving images, clearing the
//! cache and health checks.
//!
//! # Endpoints
//!
//! - `GET /{path}` - Serve the WebP rendition of an image
//! - `GET /clearcache?key=<secret>` - Remove every cached artifact
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{ClearCacheError, ImageError};
use crate::pipeline::{ImageService, ImageSource};

use super::auth::ClearKey;
use super::serve::serve_file;

/// Body of a successful `/clearcache`.
pub const CACHE_CLEARED_MESSAGE: &str = "Cache cleared successfully";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the image service.
///
/// This is passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// The image service for processing image requests
    pub image_service: Arc<ImageService>,

    /// Secret guarding `/clearcache`
    pub clear_key: ClearKey,

    /// Cache control max-age in seconds
    pub cache_max_age: u32,
}

impl AppState {
    /// Create a new application state.
    pub fn new(image_service: ImageService, clear_key: ClearKey, cache_max_age: u32) -> Self {
        Self {
            image_service: Arc::new(image_service),
            clear_key,
            cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for the cache clear endpoint.
#[derive(Debug, Deserialize)]
pub struct ClearCacheParams {
    /// Secret that must match the configured cache clear key
    #[serde(default)]
    pub key: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "unsupported_format")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Log by severity and build the JSON error body.
///
/// 404s are common and logged at DEBUG, other 4xx at WARN, 5xx at ERROR.
fn error_response(status: StatusCode, error_type: &'static str, message: String) -> Response {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Resource not found: {}",
            message
        );
    } else {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let error_response = ErrorResponse::with_status(error_type, message, status);

    (status, Json(error_response)).into_response()
}

/// Convert ImageError to HTTP response.
impl IntoResponse for ImageError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ImageError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            ImageError::InvalidPath { .. } => (StatusCode::FORBIDDEN, "invalid_path"),
            ImageError::UnsupportedFormat { .. } => {
                (StatusCode::BAD_REQUEST, "unsupported_format")
            }
            ImageError::Read { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "read_error"),
            ImageError::Decode { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),
            ImageError::Encode { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
            ImageError::CacheWrite(_) => (StatusCode::INTERNAL_SERVER_ERROR, "cache_write_error"),
            ImageError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        error_response(status, error_type, self.to_string())
    }
}

/// Convert ClearCacheError to HTTP response.
impl IntoResponse for ClearCacheError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ClearCacheError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            ClearCacheError::Cache(_) => (StatusCode::INTERNAL_SERVER_ERROR, "cache_error"),
        };

        error_response(status, error_type, self.to_string())
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle image requests.
///
/// # Endpoint
///
/// `GET /{path}`
///
/// The request path (percent-decoded) is resolved against the source root.
///
/// # Response
///
/// - `200 OK`: WebP image with `Content-Type: image/webp`
/// - `304 Not Modified`: conditional request matched
/// - `400 Bad Request`: Original is not JPEG, PNG or WebP
/// - `403 Forbidden`: Path escapes the source root
/// - `404 Not Found`: Original not found
/// - `500 Internal Server Error`: Decode, encode or cache write failure
///
/// # Headers
///
/// - `Content-Type: image/webp`
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `Last-Modified`, `ETag`
/// - `X-Cache-Hit: true|false`
pub async fn image_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, ImageError> {
    let request_path = uri.path();

    // A clear can remove the artifact between fetch and open; refetch once.
    let mut retried = false;
    loop {
        let image = state.image_service.fetch(request_path).await?;

        match serve_file(
            image.path(),
            image.content_type,
            image.cache_hit,
            state.cache_max_age,
            &headers,
        )
        .await
        {
            Ok(response) => return Ok(response),
            Err(e)
                if e.kind() == std::io::ErrorKind::NotFound
                    && matches!(image.source, ImageSource::Artifact(_))
                    && !retried =>
            {
                debug!(path = request_path, "Artifact vanished before serving, refetching");
                retried = true;
            }
            Err(e) => {
                return Err(ImageError::Read {
                    path: image.path().display().to_string(),
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Handle cache clear requests.
///
/// # Endpoint
///
/// `GET /clearcache?key=<secret>`
///
/// # Response
///
/// - `200 OK`: cache removed, plain-text confirmation
/// - `403 Forbidden`: missing or wrong key, nothing removed
/// - `500 Internal Server Error`: filesystem error while removing
pub async fn clear_cache_handler(
    State(state): State<AppState>,
    Query(params): Query<ClearCacheParams>,
) -> Result<&'static str, ClearCacheError> {
    state
        .clear_key
        .verify(params.key.as_deref().unwrap_or_default())?;

    state.image_service.clear_cache().await?;

    info!("Cache cleared");
    Ok(CACHE_CLEARED_MESSAGE)
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
