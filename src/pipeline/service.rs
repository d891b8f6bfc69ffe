//! Image Service for orchestrating on-demand conversion.
//!
//! The ImageService is the main entry point for image requests. Per request
//! it walks this state machine:
//!
//! ```text
//! CHECK_CACHE ──hit──────────────────────────────────────────► SERVE_CACHED
//!      │
//!     miss
//!      ▼
//! OPEN_ORIGINAL ─► SNIFF ─► DISPATCH ─┬─ Convert ─► DECODE ─► ENCODE ─► WRITE_CACHE ─► SERVE_CACHED
//!                                     └─ PassThrough ────────────────────────────────► SERVE_ORIGINAL
//! ```
//!
//! Any failure ends the request with an [`ImageError`]; nothing is retried
//! and nothing falls back. Conversions are single-flight per original path.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::cache::{CacheStore, SingleFlight};
use crate::codec::{decode, dispatch, Dispatch, SourceFormat, WebpEncoder};
use crate::error::{CacheError, ImageError};
use crate::format::{sniff, ContentType};

/// MIME type of every converted artifact.
pub const ARTIFACT_CONTENT_TYPE: &str = "image/webp";

// =============================================================================
// Image Response
// =============================================================================

/// Where the bytes for a response come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A cached (possibly just written) WebP artifact
    Artifact(PathBuf),

    /// The original file, already WebP
    Original(PathBuf),
}

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct ImageResponse {
    /// File to stream to the client
    pub source: ImageSource,

    /// Content type of the file
    pub content_type: &'static str,

    /// Whether the artifact already existed when the request arrived
    pub cache_hit: bool,
}

impl ImageResponse {
    /// Path of the file to serve.
    pub fn path(&self) -> &Path {
        match &self.source {
            ImageSource::Artifact(path) | ImageSource::Original(path) => path,
        }
    }
}

/// Shared result of a single-flight conversion.
#[derive(Debug, Clone)]
enum Outcome {
    /// Artifact appeared while waiting to convert
    AlreadyCached(PathBuf),
    Converted(PathBuf),
    PassThrough(PathBuf),
}

// =============================================================================
// Image Service
// =============================================================================

/// Service converting originals under a source root into cached WebP.
///
/// # Example
///
/// ```ignore
/// use nimage::cache::CacheStore;
/// use nimage::pipeline::ImageService;
///
/// let service = ImageService::new("/srv/images", CacheStore::new("/var/cache/nimage"), 80);
/// let response = service.fetch("/photos/a.jpg").await?;
/// println!("serve {} (cache hit: {})", response.path().display(), response.cache_hit);
/// ```
pub struct ImageService {
    /// Directory request paths are resolved against
    source_root: PathBuf,

    /// Artifact store
    cache: CacheStore,

    /// WebP encoder at the configured quality
    encoder: WebpEncoder,

    /// In-flight conversions keyed by original path
    flights: SingleFlight<PathBuf, Result<Outcome, ImageError>>,

    /// Number of decode+encode runs started
    conversions: Arc<AtomicU64>,
}

impl ImageService {
    /// Create a new image service.
    ///
    /// # Arguments
    ///
    /// * `source_root` - Directory that request paths are resolved against
    /// * `cache` - Artifact store
    /// * `quality` - WebP quality (0-100, clamped)
    pub fn new(source_root: impl Into<PathBuf>, cache: CacheStore, quality: u8) -> Self {
        Self {
            source_root: source_root.into(),
            cache,
            encoder: WebpEncoder::new(quality),
            flights: SingleFlight::new(),
            conversions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The artifact store.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Quality used for encoding.
    pub fn quality(&self) -> u8 {
        self.encoder.quality()
    }

    /// Number of decode+encode runs started since creation.
    pub fn conversions(&self) -> u64 {
        self.conversions.load(Ordering::Relaxed)
    }

    /// Fetch the servable file for a request path.
    ///
    /// Serves the cached artifact when present. Otherwise runs the
    /// conversion (at most once per path at a time) and returns the newly
    /// published artifact, or the original when it is already WebP.
    ///
    /// # Errors
    ///
    /// - [`ImageError::InvalidPath`] if the path escapes the source root
    /// - [`ImageError::NotFound`] if the original does not exist
    /// - [`ImageError::UnsupportedFormat`] if the original is not JPEG/PNG/WebP
    /// - [`ImageError::Decode`], [`ImageError::Encode`],
    ///   [`ImageError::CacheWrite`], [`ImageError::Read`] on processing failure
    pub async fn fetch(&self, request_path: &str) -> Result<ImageResponse, ImageError> {
        let relative = resolve_request_path(request_path)?;

        debug!(path = %relative.display(), "Handling image request");

        if self.cache.exists(&relative).await {
            let artifact = self.cache.artifact_path(&relative);
            debug!(artifact = %artifact.display(), "Serving cached file");
            return Ok(ImageResponse {
                source: ImageSource::Artifact(artifact),
                content_type: ARTIFACT_CONTENT_TYPE,
                cache_hit: true,
            });
        }

        let job = ConversionJob {
            relative: relative.clone(),
            original: self.source_root.join(&relative),
            cache: self.cache.clone(),
            encoder: self.encoder,
            conversions: Arc::clone(&self.conversions),
        };

        let outcome = self
            .flights
            .run(relative, move || job.clone().run())
            .await?;

        Ok(match outcome {
            Outcome::AlreadyCached(artifact) => ImageResponse {
                source: ImageSource::Artifact(artifact),
                content_type: ARTIFACT_CONTENT_TYPE,
                cache_hit: true,
            },
            Outcome::Converted(artifact) => ImageResponse {
                source: ImageSource::Artifact(artifact),
                content_type: ARTIFACT_CONTENT_TYPE,
                cache_hit: false,
            },
            Outcome::PassThrough(original) => ImageResponse {
                source: ImageSource::Original(original),
                content_type: ContentType::Webp.mime(),
                cache_hit: false,
            },
        })
    }

    /// Remove every cached artifact.
    pub async fn clear_cache(&self) -> Result<(), CacheError> {
        self.cache.clear().await
    }

    /// Number of conversions currently in flight.
    pub fn in_flight(&self) -> usize {
        self.flights.in_flight_count()
    }
}

// =============================================================================
// Conversion Job
// =============================================================================

/// Everything a conversion needs, owned so it can run on a detached task.
#[derive(Clone)]
struct ConversionJob {
    relative: PathBuf,
    original: PathBuf,
    cache: CacheStore,
    encoder: WebpEncoder,
    conversions: Arc<AtomicU64>,
}

impl ConversionJob {
    async fn run(self) -> Result<Outcome, ImageError> {
        // A previous leader may have published while we queued up
        if self.cache.exists(&self.relative).await {
            return Ok(Outcome::AlreadyCached(
                self.cache.artifact_path(&self.relative),
            ));
        }

        let data = read_original(&self.original).await?;

        let content_type = sniff(&data);
        debug!(
            path = %self.original.display(),
            content_type = content_type.mime(),
            "Detected content type"
        );

        match dispatch(content_type)? {
            Dispatch::PassThrough => {
                debug!(path = %self.original.display(), "Serving original WebP file");
                Ok(Outcome::PassThrough(self.original))
            }
            Dispatch::Convert(format) => {
                self.conversions.fetch_add(1, Ordering::Relaxed);
                let artifact = tokio::task::spawn_blocking(move || self.convert(format, &data))
                    .await
                    .map_err(|e| ImageError::Internal {
                        message: e.to_string(),
                    })??;

                debug!(artifact = %artifact.display(), "Converted and cached image");
                Ok(Outcome::Converted(artifact))
            }
        }
    }

    /// Decode, encode and publish. Blocking.
    fn convert(&self, format: SourceFormat, data: &[u8]) -> Result<PathBuf, ImageError> {
        let img = decode(format, data)?;
        let encoded = self.encoder.encode(&img)?;
        drop(img);

        Ok(self.cache.write(&self.relative, &encoded)?)
    }
}

/// Read an original image fully into memory.
///
/// A missing path, or one that is not a regular file, is `NotFound`. I/O
/// errors after a successful open are `Read`.
async fn read_original(path: &Path) -> Result<Vec<u8>, ImageError> {
    let display = path.display().to_string();

    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|_| ImageError::NotFound {
            path: display.clone(),
        })?;

    let metadata = file.metadata().await.map_err(|e| ImageError::Read {
        path: display.clone(),
        message: e.to_string(),
    })?;
    if !metadata.is_file() {
        return Err(ImageError::NotFound { path: display });
    }

    let mut data = Vec::with_capacity(metadata.len() as usize);
    file.read_to_end(&mut data)
        .await
        .map_err(|e| ImageError::Read {
            path: display,
            message: e.to_string(),
        })?;

    Ok(data)
}

// =============================================================================
// Path Resolution
// =============================================================================

/// Turn a request path into a normalized path relative to the source root.
///
/// The path is percent-decoded; `.` segments and repeated slashes are
/// dropped. `..` segments are rejected outright rather than resolved.
///
/// # Errors
///
/// - [`ImageError::InvalidPath`] for undecodable paths or `..` segments
/// - [`ImageError::NotFound`] for the root path itself
pub fn resolve_request_path(request_path: &str) -> Result<PathBuf, ImageError> {
    let decoded = urlencoding::decode(request_path).map_err(|_| ImageError::InvalidPath {
        path: request_path.to_string(),
    })?;

    let mut relative = PathBuf::new();
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(ImageError::InvalidPath {
                    path: request_path.to_string(),
                });
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(ImageError::NotFound {
            path: request_path.to_string(),
        });
    }

    Ok(relative)
}

// =============================================================================
// Tests
// =============================================================================
