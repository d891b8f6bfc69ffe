//! # nimage
//!
//! An HTTP image proxy that serves JPEG and PNG originals as WebP.
//!
//! The first request for an image decodes the original, encodes it as lossy
//! WebP at the configured quality and stores the result in an on-disk cache.
//! Later requests stream the cached artifact. The whole cache can be dropped
//! through a secret-protected endpoint.
//!
//! ## Features
//!
//! - **Content sniffing**: the source encoding is detected from magic bytes, not the file name
//! - **Single-flight conversion**: concurrent misses for one path convert once
//! - **Atomic cache writes**: artifacts are published by rename, never seen half-written
//! - **Conditional GET**: `ETag` / `Last-Modified` validators with `304` responses
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`mod@format`] - content sniffing
//! - [`codec`] - JPEG/PNG decoding and WebP encoding
//! - [`cache`] - on-disk artifact store and single-flight registry
//! - [`pipeline`] - the per-request conversion state machine
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use nimage::{create_router, CacheStore, ImageService, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let service = ImageService::new("/", CacheStore::new("/var/cache/nimage"), 80);
//!     let router = create_router(service, RouterConfig::new("change-me"));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, router).await
//! }
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod server;

// Re-export commonly used types
pub use cache::{CacheStore, SingleFlight, ARTIFACT_EXTENSION};
pub use codec::{
    clamp_quality, decode, dispatch, is_valid_quality, Dispatch, SourceFormat, WebpEncoder,
    DEFAULT_QUALITY, MAX_QUALITY, MIN_QUALITY,
};
pub use config::{Cli, ConfigError, ServiceConfig};
pub use error::{CacheError, ClearCacheError, CodecError, ImageError};
pub use format::{is_webp_header, sniff, ContentType};
pub use pipeline::{
    resolve_request_path, ImageResponse, ImageService, ImageSource, ARTIFACT_CONTENT_TYPE,
};
pub use server::{
    clear_cache_handler, create_router, health_handler, image_handler, AppState, ClearKey,
    ErrorResponse, HealthResponse, RouterConfig,
};
