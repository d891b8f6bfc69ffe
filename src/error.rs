use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while decoding an original or encoding the WebP output
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// Source stream is malformed or truncated
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// The WebP encoder rejected the image
    #[error("Encode error: {message}")]
    Encode { message: String },

    /// No decoder is registered for the sniffed content type
    #[error("Unsupported format: {content_type}")]
    UnsupportedFormat { content_type: String },
}

/// Errors from the on-disk artifact cache
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Parent directory for an artifact could not be created
    #[error("Failed to create cache directory {path}: {message}")]
    CreateDir { path: PathBuf, message: String },

    /// Artifact could not be written or published
    #[error("Failed to write cache artifact {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// Cache root could not be removed
    #[error("Failed to clear cache {path}: {message}")]
    Clear { path: PathBuf, message: String },
}

/// Per-request failures of the conversion pipeline.
///
/// Every variant is terminal for the request. The HTTP mapping lives in
/// `server::handlers`.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    /// Original file is missing or cannot be opened (HTTP 404)
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// Request path escapes the source root (HTTP 403)
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    /// Original opened but could not be read (HTTP 500)
    #[error("Error reading file {path}: {message}")]
    Read { path: String, message: String },

    /// Sniffed content type has no decoder (HTTP 400)
    #[error("Unsupported file type: {content_type}")]
    UnsupportedFormat { content_type: String },

    /// Original could not be decoded (HTTP 500)
    #[error("Error processing image: {message}")]
    Decode { message: String },

    /// WebP encoding failed (HTTP 500)
    #[error("Error encoding image: {message}")]
    Encode { message: String },

    /// Artifact could not be written (HTTP 500)
    #[error("Cache write failed: {0}")]
    CacheWrite(#[from] CacheError),

    /// Conversion task died before producing a result (HTTP 500)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<CodecError> for ImageError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Decode { message } => ImageError::Decode { message },
            CodecError::Encode { message } => ImageError::Encode { message },
            CodecError::UnsupportedFormat { content_type } => {
                ImageError::UnsupportedFormat { content_type }
            }
        }
    }
}

/// Failures of the cache invalidation endpoint
#[derive(Debug, Clone, Error)]
pub enum ClearCacheError {
    /// Provided key does not match the configured secret (HTTP 403)
    #[error("Invalid cache clear key")]
    Forbidden,

    /// Filesystem error while removing the cache root (HTTP 500)
    #[error("Error clearing cache: {0}")]
    Cache(#[from] CacheError),
}
